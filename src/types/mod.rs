// ABOUTME: Domain value types shared by every component.
// ABOUTME: Pod identities and canonical image keys.

mod image_key;
mod instance;

pub use image_key::ImageKey;
pub use instance::InstanceId;
