//! Script command parsing.
//!
//! One command per line. Blank lines and lines starting with `#` are
//! skipped.

use std::path::PathBuf;

use anyhow::{Context, bail};
use gridmap_core::{Color, EditorMode, GroupId, ObjectId, ObjectKind};

#[derive(Debug, Clone, PartialEq)]
pub enum EnvSetting {
    Ambient(f32),
    Light(f32),
    Background(Color),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Mode(EditorMode),
    Kind(ObjectKind),
    /// Pointer-down on empty space above the ground point.
    Click { x: f32, z: f32 },
    /// Pointer-down on an object.
    Press(ObjectId),
    Drag { x: f32, z: f32 },
    Lift { y: f32 },
    Release,
    Grab,
    Cancel,
    Delete,
    Key(String),
    Select(ObjectId),
    Duplicate(ObjectId),
    Rename { id: String, name: String },
    Group { name: String, members: Vec<ObjectId> },
    Ungroup(GroupId),
    Env(EnvSetting),
    List,
    Status,
    Clear,
    Save,
    Export(Option<PathBuf>),
    Import(PathBuf),
}

impl Command {
    /// Parses one script line. Returns `Ok(None)` for blank lines and
    /// comments.
    pub fn parse(line: &str) -> anyhow::Result<Option<Self>> {
        let line = line.trim();
        if line.starts_with('#') {
            return Ok(None);
        }
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();

        let command = match (name, args.as_slice()) {
            ("mode", [mode]) => Self::Mode(mode.parse().map_err(anyhow::Error::msg)?),
            ("kind", [kind]) => Self::Kind(kind.parse().map_err(anyhow::Error::msg)?),
            ("click", [x, z]) => Self::Click {
                x: number(x)?,
                z: number(z)?,
            },
            ("press", [id]) => Self::Press(ObjectId::new(*id)),
            ("drag", [x, z]) => Self::Drag {
                x: number(x)?,
                z: number(z)?,
            },
            ("lift", [y]) => Self::Lift { y: number(y)? },
            ("release", []) => Self::Release,
            ("grab", []) => Self::Grab,
            ("cancel", []) => Self::Cancel,
            ("delete", []) => Self::Delete,
            ("key", [key]) => Self::Key((*key).to_string()),
            ("select", [id]) => Self::Select(ObjectId::new(*id)),
            ("duplicate", [id]) => Self::Duplicate(ObjectId::new(*id)),
            ("rename", [id, name @ ..]) if !name.is_empty() => Self::Rename {
                id: (*id).to_string(),
                name: name.join(" "),
            },
            ("group", [name, members @ ..]) => Self::Group {
                name: (*name).to_string(),
                members: members.iter().map(|id| ObjectId::new(*id)).collect(),
            },
            ("ungroup", [id]) => Self::Ungroup(GroupId::new(*id)),
            ("env", ["ambient", value]) => Self::Env(EnvSetting::Ambient(number(value)?)),
            ("env", ["light", value]) => Self::Env(EnvSetting::Light(number(value)?)),
            ("env", ["background", value]) => Self::Env(EnvSetting::Background(value.parse()?)),
            ("list", []) => Self::List,
            ("status", []) => Self::Status,
            ("clear", []) => Self::Clear,
            ("save", []) => Self::Save,
            ("export", []) => Self::Export(None),
            ("export", [path]) => Self::Export(Some(PathBuf::from(*path))),
            ("import", [path]) => Self::Import(PathBuf::from(*path)),
            _ => bail!("unrecognized command: {line}"),
        };
        Ok(Some(command))
    }
}

fn number(text: &str) -> anyhow::Result<f32> {
    let value: f32 = text
        .parse()
        .with_context(|| format!("expected a number, got {text:?}"))?;
    if !value.is_finite() {
        bail!("expected a finite number, got {text:?}");
    }
    Ok(value)
}
