//! Pipeline constants
//!
//! Markers and file-name formats shared between section generation, the
//! assembler and the export service.

/// Marker the model is asked to end every section with
pub const END_SECTION_MARKER: &str = "<!--END_SECTION-->";

/// Separator rendered after every section
pub const SECTION_SEPARATOR: &str = "---";

/// Block rendered in place of a failed section
/// Format: "{PLACEHOLDER_PREFIX} ({failure kind})."
pub const PLACEHOLDER_PREFIX: &str = "> ⚠ This section is unavailable";

/// Number of leading characters of a section brief used in image prompts
pub const IMAGE_BRIEF_CHARS: usize = 600;
