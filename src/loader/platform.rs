//! Platform detection and native binary naming

use std::fmt;

use crate::errors::LoadError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    Linux,
    Darwin,
    Windows,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    Amd64,
    X86,
    Arm64,
    Arm,
}

impl Os {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Darwin => "darwin",
            Self::Windows => "windows",
        }
    }

    /// Shared library extension, without the dot
    pub const fn library_extension(self) -> &'static str {
        match self {
            Self::Linux => "so",
            Self::Darwin => "dylib",
            Self::Windows => "dll",
        }
    }
}

impl Arch {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Amd64 => "amd64",
            Self::X86 => "386",
            Self::Arm64 => "arm64",
            Self::Arm => "arm",
        }
    }
}

/// Target the native binary is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

impl Platform {
    pub const fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Platform of the running process
    pub fn current() -> Result<Self, LoadError> {
        Self::from_target(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Map Rust target names (`std::env::consts`) to SMA binary names
    pub fn from_target(os: &str, arch: &str) -> Result<Self, LoadError> {
        let unsupported = || LoadError::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        };

        let os_kind = match os {
            "linux" => Os::Linux,
            "macos" => Os::Darwin,
            "windows" => Os::Windows,
            _ => return Err(unsupported()),
        };

        let arch_kind = match arch {
            "x86_64" => Arch::Amd64,
            "x86" => Arch::X86,
            "aarch64" => Arch::Arm64,
            "arm" => Arch::Arm,
            _ => return Err(unsupported()),
        };

        Ok(Self::new(os_kind, arch_kind))
    }

    /// `<base>-<os>-<arch>.<ext>`
    pub fn library_file_name(&self, base_name: &str) -> String {
        format!(
            "{}-{}-{}.{}",
            base_name,
            self.os.as_str(),
            self.arch.as_str(),
            self.os.library_extension()
        )
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os.as_str(), self.arch.as_str())
    }
}
