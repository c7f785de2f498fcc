use anyhow::{anyhow, Result};
use arboard::Clipboard;

pub struct ClipboardService;

impl ClipboardService {
    pub fn set(text: &str) -> Result<()> {
        let mut clipboard =
            Clipboard::new().map_err(|e| anyhow!("Failed to initialize clipboard: {}", e))?;
        clipboard
            .set_text(text)
            .map_err(|e| anyhow!("Failed to set clipboard text: {}", e))?;
        log::debug!("Copied {} byte(s) to the clipboard", text.len());
        Ok(())
    }
}
