//! Status and type enums stored as lowercase text columns.
//!
//! Each variant's wire value is the exact string persisted in the database
//! and serialized to API clients.

use std::fmt;

use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef, Postgres};

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $val)] $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$( $name::$variant ),+];

            /// Return the stored text value.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $val ),+
                }
            }

            /// Parse a stored text value.
            pub fn parse(raw: &str) -> Option<Self> {
                match raw {
                    $( $val => Some($name::$variant), )+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl sqlx::Type<Postgres> for $name {
            fn type_info() -> PgTypeInfo {
                <String as sqlx::Type<Postgres>>::type_info()
            }

            fn compatible(ty: &PgTypeInfo) -> bool {
                <String as sqlx::Type<Postgres>>::compatible(ty)
            }
        }

        impl<'q> sqlx::Encode<'q, Postgres> for $name {
            fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
                <&str as sqlx::Encode<'q, Postgres>>::encode_by_ref(&self.as_str(), buf)
            }
        }

        impl<'r> sqlx::Decode<'r, Postgres> for $name {
            fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
                let raw = <&str as sqlx::Decode<'r, Postgres>>::decode(value)?;
                Self::parse(raw).ok_or_else(|| {
                    format!("unknown {} value: {raw}", stringify!($name)).into()
                })
            }
        }
    };
}

define_status_enum! {
    /// Operation lifecycle status.
    OperationStatus {
        Queued = "queued",
        Running = "running",
        Succeeded = "succeeded",
        Failed = "failed",
        Cancelled = "cancelled",
    }
}

impl OperationStatus {
    /// Terminal statuses never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OperationStatus::Succeeded | OperationStatus::Failed | OperationStatus::Cancelled
        )
    }
}

define_status_enum! {
    /// Kind of work an operation tracks.
    OperationType {
        CreateStoryboard = "create_storyboard",
        RegenerateShot = "regenerate_shot",
        RenderVideo = "render_video",
    }
}

define_status_enum! {
    /// Story generation status.
    StoryStatus {
        Draft = "draft",
        Generating = "generating",
        Ready = "ready",
        Failed = "failed",
    }
}

define_status_enum! {
    /// Shot generation status.
    ShotStatus {
        Pending = "pending",
        Rendering = "rendering",
        Done = "done",
        Failed = "failed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_status_values_match_schema() {
        let values: Vec<_> = OperationStatus::ALL.iter().map(|s| s.as_str()).collect();
        assert_eq!(
            values,
            ["queued", "running", "succeeded", "failed", "cancelled"]
        );
    }

    #[test]
    fn terminal_statuses() {
        assert!(!OperationStatus::Queued.is_terminal());
        assert!(!OperationStatus::Running.is_terminal());
        assert!(OperationStatus::Succeeded.is_terminal());
        assert!(OperationStatus::Failed.is_terminal());
        assert!(OperationStatus::Cancelled.is_terminal());
    }

    #[test]
    fn parse_round_trips_every_variant() {
        for status in ShotStatus::ALL {
            assert_eq!(ShotStatus::parse(status.as_str()), Some(*status));
        }
        assert_eq!(StoryStatus::parse("archived"), None);
    }

    #[test]
    fn serializes_as_stored_text() {
        let json = serde_json::to_string(&OperationType::RegenerateShot).unwrap();
        assert_eq!(json, "\"regenerate_shot\"");
    }
}
