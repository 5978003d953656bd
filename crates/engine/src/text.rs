use crate::tilemap::{SharedTilemap, TilemapError};

/// Renders a string into a one-row tilemap of glyph indices. Glyph sheets
/// start at the space character, so each index is the ASCII code minus 32.
pub struct TextTilemap {
    tilemap: SharedTilemap<i32>,
    text: String,
}

impl TextTilemap {
    pub fn new(tilemap: SharedTilemap<i32>) -> Self {
        Self {
            tilemap,
            text: String::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tilemap(&self) -> SharedTilemap<i32> {
        self.tilemap.clone()
    }

    pub fn set_text(&mut self, text: &str) -> Result<(), TilemapError> {
        let glyphs: Vec<i32> = text.chars().map(|c| c as i32 - 32).collect();
        let mut tilemap = self.tilemap.borrow_mut();
        tilemap.resize(glyphs.len() as i32, 1)?;
        tilemap.replace_all(glyphs)?;
        self.text = text.to_string();
        Ok(())
    }
}
