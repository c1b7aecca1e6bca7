use std::path::Path;

/// Moves a single path to a reversible trash location.
pub trait TrashMover {
    fn move_to_trash(&self, path: &Path) -> Result<(), String>;
}

/// The platform trash (Recycle Bin, macOS Trash, freedesktop trash).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTrash;

impl TrashMover for SystemTrash {
    fn move_to_trash(&self, path: &Path) -> Result<(), String> {
        ::trash::delete(path).map_err(|e| e.to_string())
    }
}

/// Display name of the trash location on this platform.
pub fn trash_location_name() -> &'static str {
    if cfg!(windows) {
        "Recycle Bin"
    } else {
        "Trash"
    }
}

/// Short platform label for status output.
pub fn platform_name() -> &'static str {
    match std::env::consts::OS {
        "windows" => "Windows",
        "macos" => "macOS",
        "linux" => "Linux",
        other => other,
    }
}
