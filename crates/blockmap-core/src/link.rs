//! Shareable `mermaid.live` editor links.
//!
//! The editor state is a JSON document holding the diagram source plus
//! editor settings. It is zlib-compressed at level 9 and base64url-encoded
//! (no padding) after a `pako:` prefix in the URL fragment.

use std::io::Write as _;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Editor URL the encoded state is appended to.
pub const EDITOR_URL: &str = "https://mermaid.live/edit#pako:";

const MERMAID_THEME: &str = "{\n  \"theme\": \"dark\"\n}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pan {
    pub x: i32,
    pub y: i32,
}

/// Editor state accepted by mermaid.live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorState {
    pub code: String,
    pub mermaid: String,
    pub auto_sync: bool,
    pub update_diagram: bool,
    pub pan_zoom: bool,
    pub pan: Pan,
    pub zoom: u32,
    pub update_editor: bool,
    pub editor_mode: String,
    pub rough: bool,
}

impl EditorState {
    /// Dark-themed, auto-syncing editor state for `graph`.
    #[must_use]
    pub fn for_graph(graph: &str) -> Self {
        Self {
            code: graph.to_string(),
            mermaid: MERMAID_THEME.to_string(),
            auto_sync: true,
            update_diagram: true,
            pan_zoom: true,
            pan: Pan { x: 0, y: 0 },
            zoom: 1,
            update_editor: false,
            editor_mode: "code".to_string(),
            rough: false,
        }
    }
}

/// Build a mermaid.live link that opens `graph` in the editor.
///
/// # Errors
///
/// Returns [`Error::Encode`] if serialization or compression fails.
pub fn build_link(graph: &str) -> Result<String> {
    let state = EditorState::for_graph(graph);
    let json = serde_json::to_vec(&state).map_err(|e| Error::Encode(e.to_string()))?;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder
        .write_all(&json)
        .map_err(|e| Error::Encode(e.to_string()))?;
    let compressed = encoder.finish().map_err(|e| Error::Encode(e.to_string()))?;

    Ok(format!("{EDITOR_URL}{}", URL_SAFE_NO_PAD.encode(compressed)))
}
