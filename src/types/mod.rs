// ABOUTME: Validated domain types shared across the deployment pipeline.
// ABOUTME: Image coordinates, Kubernetes resource names, and redacted secret values.

mod image_coordinate;
mod resource_name;
mod secret;

pub use image_coordinate::{DEFAULT_TAG, ImageCoordinate, ParseImageError, ecr_registry_host};
pub use resource_name::{ResourceName, ResourceNameError};
pub use secret::{SecretOutcome, SecretReference, SecretValue};
