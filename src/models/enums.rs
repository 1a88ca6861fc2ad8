use serde::{Deserialize, Serialize};

use super::ModelError;

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ModelError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(ParameterStatus {
    Normal => "normal",
    High => "high",
    Low => "low",
    Critical => "critical",
});

str_enum!(ParameterCategory {
    Blood => "blood",
    Urine => "urine",
    Lipid => "lipid",
    Liver => "liver",
    Kidney => "kidney",
    Hormone => "hormone",
    Vitamin => "vitamin",
});

str_enum!(DocumentKind {
    Pdf => "pdf",
    Image => "image",
});

str_enum!(ReportStatus {
    Completed => "completed",
    Failed => "failed",
});

impl ParameterStatus {
    /// Anything other than `Normal` is worth surfacing to the user.
    pub fn is_abnormal(&self) -> bool {
        !matches!(self, Self::Normal)
    }
}
