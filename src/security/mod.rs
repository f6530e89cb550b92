//! Input safety checks shared by every tool.

pub mod validators;

pub use validators::{
    require_command, require_file_path, require_image_id, require_session_id, require_timeout,
    require_timeout_value, sanitize_content, validate_command, validate_file_path,
    validate_image_id, validate_session_id, validate_timeout, ValidationError, ALLOWED_IMAGE_IDS,
};
