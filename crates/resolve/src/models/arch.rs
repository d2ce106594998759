use std::fmt::{Display, Formatter, Result as FmtResult};

/// CPU architecture an application or launch option is built for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CpuArch {
    /// The store didn't say.
    #[default]
    Unspecified,
    /// 32-bit
    X86,
    /// 64-bit
    X64,
    /// Runs on either, or couldn't be interpreted.
    Any,
}
impl CpuArch {
    /// Maps the store's bitness number; anything unexpected is [`Any`](Self::Any).
    pub fn from_bits(bits: i64) -> Self {
        match bits {
            0 => Self::Unspecified,
            32 => Self::X86,
            64 => Self::X64,
            _ => Self::Any,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unspecified => "unspecified",
            Self::X86 => "x86",
            Self::X64 => "x64",
            Self::Any => "any",
        }
    }
}

impl Display for CpuArch {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}
