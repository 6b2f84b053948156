//! Common surface of the linked views

use serde_json::Value;
use uuid::Uuid;

use crate::ViewError;

/// Unique identifier for a view
pub type SpaceViewId = Uuid;

/// Base trait for the rank plot, the sample plot and the feature list
pub trait SpaceView: Send + Sync {
    /// Get the unique ID of this view
    fn id(&self) -> SpaceViewId;

    /// Get the view type (for serialization)
    fn view_type(&self) -> &str;

    /// Get the title of this view
    fn title(&self) -> &str;

    /// Save the user-adjustable settings
    fn save_config(&self) -> Value;

    /// Restore settings written by `save_config`
    fn load_config(&mut self, config: Value) -> Result<(), ViewError>;

    /// Get as any for downcasting
    fn as_any(&self) -> &dyn std::any::Any;
}
