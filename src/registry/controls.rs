//! Push buttons and control groups from `:ctrldef`.

use std::io::Write;

use super::Section;
use crate::error::{Error, Result};
use crate::util::{encode_truncated, to_u16};

/// Marker for "no control group".
pub const NO_GROUP: u16 = 0xFFFF;

const BUTTON_TYPE_PUSH: u16 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub id: String,
    pub res: u16,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlGroup {
    pub id: String,
    /// Positions in the button list.
    pub buttons: Vec<u16>,
}

#[derive(Debug, Default)]
pub struct Controls {
    buttons: Vec<Button>,
    groups: Vec<ControlGroup>,
    /// Group shown on the cover page.
    cover: Option<u16>,
}

impl Controls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_button(&mut self, button: Button) -> Result<u16> {
        if self.buttons.iter().any(|b| b.id == button.id) {
            return Err(Error::DuplicateControl(button.id));
        }
        self.buttons.push(button);
        Ok(to_u16(self.buttons.len() - 1))
    }

    /// Define group `id` holding the named buttons.
    pub fn add_group(&mut self, id: &str, buttons: &[&str], cover: bool) -> Result<u16> {
        if self.groups.iter().any(|g| g.id == id) {
            return Err(Error::DuplicateControl(id.to_string()));
        }
        let buttons = buttons
            .iter()
            .map(|name| self.button_index(name))
            .collect::<Result<Vec<_>>>()?;
        self.groups.push(ControlGroup {
            id: id.to_string(),
            buttons,
        });
        let index = to_u16(self.groups.len() - 1);
        if cover {
            self.cover = Some(index);
        }
        Ok(index)
    }

    pub fn button_index(&self, id: &str) -> Result<u16> {
        self.buttons
            .iter()
            .position(|b| b.id == id)
            .map(to_u16)
            .ok_or_else(|| Error::UnknownControl(id.to_string()))
    }

    pub fn group_index(&self, id: &str) -> Result<u16> {
        self.groups
            .iter()
            .position(|g| g.id == id)
            .map(to_u16)
            .ok_or_else(|| Error::UnknownControl(id.to_string()))
    }

    fn button_text(button: &Button) -> Vec<u8> {
        encode_truncated(&button.text, u8::MAX as usize).0
    }
}

impl Section for Controls {
    fn size(&self) -> usize {
        self.buttons.len() + self.groups.len()
    }

    fn length(&self) -> usize {
        let buttons: usize = self
            .buttons
            .iter()
            .map(|b| 5 + Self::button_text(b).len())
            .sum();
        let groups: usize = self.groups.iter().map(|g| 2 + 2 * g.buttons.len()).sum();
        8 + buttons + groups
    }

    /// `u16 button count, u16 group count, u16 cover group, u16 reserved`,
    /// then buttons (`u16 type, u16 res, u8 length, text`), then groups
    /// (`u16 count, u16 button indices`).
    fn write_to(&self, out: &mut dyn Write) -> Result<()> {
        out.write_all(&to_u16(self.buttons.len()).to_le_bytes())?;
        out.write_all(&to_u16(self.groups.len()).to_le_bytes())?;
        out.write_all(&self.cover.unwrap_or(NO_GROUP).to_le_bytes())?;
        out.write_all(&0u16.to_le_bytes())?;
        for button in &self.buttons {
            let text = Self::button_text(button);
            out.write_all(&BUTTON_TYPE_PUSH.to_le_bytes())?;
            out.write_all(&button.res.to_le_bytes())?;
            out.write_all(&[text.len() as u8])?;
            out.write_all(&text)?;
        }
        for group in &self.groups {
            out.write_all(&to_u16(group.buttons.len()).to_le_bytes())?;
            for index in &group.buttons {
                out.write_all(&index.to_le_bytes())?;
            }
        }
        Ok(())
    }
}
