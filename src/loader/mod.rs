//! Library loader - locate and open the platform's SMA binary
//!
//! Resolution order:
//! 1. explicit path from configuration (or `SMA_LIBRARY_PATH`), used as-is
//! 2. each configured search directory, in order
//! 3. the directory of the running executable

mod platform;

pub use platform::{Arch, Os, Platform};

use std::path::PathBuf;

use tracing::{debug, info};

use crate::config::LibrarySettings;
use crate::errors::LoadError;
use crate::interop::{DynamicLibrary, LibraryHandle, SymbolNames};

/// Produces a library handle exposing `Invoke` and `Free`
pub trait Loader {
    type Handle: LibraryHandle;

    fn load(&self) -> Result<Self::Handle, LoadError>;
}

/// Loads the SMA binary matching the current platform
#[derive(Debug, Clone)]
pub struct SmaLoader {
    settings: LibrarySettings,
    platform: Option<Platform>,
}

impl SmaLoader {
    pub fn new(settings: LibrarySettings) -> Self {
        Self {
            settings,
            platform: None,
        }
    }

    /// Resolve binaries for `platform` instead of the running one
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn settings(&self) -> &LibrarySettings {
        &self.settings
    }

    pub fn platform(&self) -> Result<Platform, LoadError> {
        match self.platform {
            Some(platform) => Ok(platform),
            None => Platform::current(),
        }
    }

    /// Expected binary file name for the target platform
    pub fn file_name(&self) -> Result<String, LoadError> {
        Ok(self.platform()?.library_file_name(&self.settings.base_name))
    }

    /// Paths probed when no explicit path is configured, in order
    pub fn candidates(&self) -> Result<Vec<PathBuf>, LoadError> {
        let file_name = self.file_name()?;

        let mut dirs = self.settings.search_paths.clone();
        if self.settings.search_exe_dir {
            if let Some(dir) = std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(|p| p.to_path_buf()))
            {
                dirs.push(dir);
            }
        }

        Ok(dirs.into_iter().map(|dir| dir.join(&file_name)).collect())
    }

    /// Pick the library path to open
    pub fn resolve(&self) -> Result<PathBuf, LoadError> {
        if let Some(path) = &self.settings.path {
            debug!(path = %path.display(), "using explicit library path");
            return Ok(path.clone());
        }

        let candidates = self.candidates()?;
        for candidate in &candidates {
            debug!(candidate = %candidate.display(), "probing for SMA library");
            if candidate.is_file() {
                return Ok(candidate.clone());
            }
        }

        Err(LoadError::NotFound {
            searched: candidates,
        })
    }

    fn symbols(&self) -> SymbolNames {
        SymbolNames::new(&self.settings.invoke_symbol, &self.settings.free_symbol)
    }
}

impl Default for SmaLoader {
    fn default() -> Self {
        Self::new(LibrarySettings::default())
    }
}

impl Loader for SmaLoader {
    type Handle = DynamicLibrary;

    fn load(&self) -> Result<DynamicLibrary, LoadError> {
        let path = self.resolve()?;
        let library = DynamicLibrary::open(&path, &self.symbols())?;
        info!(path = %path.display(), "loaded SMA library");
        Ok(library)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn settings(search_paths: Vec<PathBuf>) -> LibrarySettings {
        LibrarySettings {
            search_paths,
            search_exe_dir: false,
            ..LibrarySettings::default()
        }
    }

    #[test]
    fn test_candidates_follow_search_order() {
        let loader = SmaLoader::new(settings(vec![PathBuf::from("/opt/a"), PathBuf::from("/opt/b")]))
            .with_platform(Platform::new(Os::Linux, Arch::Arm64));

        let candidates = loader.candidates().unwrap();
        assert_eq!(
            candidates,
            vec![
                Path::new("/opt/a/com.fiskaly.kassensichv.sma-linux-arm64.so").to_path_buf(),
                Path::new("/opt/b/com.fiskaly.kassensichv.sma-linux-arm64.so").to_path_buf(),
            ]
        );
    }

    #[test]
    fn test_explicit_path_wins() {
        let mut s = settings(vec![PathBuf::from("/opt/a")]);
        s.path = Some(PathBuf::from("/custom/libsma.so"));

        let loader = SmaLoader::new(s);
        assert_eq!(loader.resolve().unwrap(), PathBuf::from("/custom/libsma.so"));
    }

    #[test]
    fn test_not_found_reports_searched_paths() {
        let loader = SmaLoader::new(settings(vec![PathBuf::from("/nonexistent/sma")]))
            .with_platform(Platform::new(Os::Windows, Arch::Amd64));

        match loader.resolve().unwrap_err() {
            LoadError::NotFound { searched } => {
                assert_eq!(
                    searched,
                    vec![PathBuf::from("/nonexistent/sma/com.fiskaly.kassensichv.sma-windows-amd64.dll")]
                );
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_exe_dir_is_last_candidate() {
        let s = LibrarySettings {
            search_paths: vec![PathBuf::from("/opt/a")],
            search_exe_dir: true,
            ..LibrarySettings::default()
        };
        let loader = SmaLoader::new(s).with_platform(Platform::new(Os::Linux, Arch::Amd64));

        let candidates = loader.candidates().unwrap();
        let exe_dir = std::env::current_exe().unwrap().parent().unwrap().to_path_buf();
        assert_eq!(candidates.len(), 2);
        assert_eq!(
            candidates[1],
            exe_dir.join("com.fiskaly.kassensichv.sma-linux-amd64.so")
        );
    }
}
