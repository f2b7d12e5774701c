pub mod services;

pub use services::{upload_recipe_image, UploadItem};
