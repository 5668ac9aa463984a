//! Request DTOs for the admin API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

use crate::images::{ImageKind, SizeVariant};
use crate::orders::{CartLine, OrderContext};

/// Request body for bulk order submission (POST /orders)
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitOrderRequest {
    pub lines: Vec<CartLine>,
    pub context: OrderContext,
}

impl SubmitOrderRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.lines.is_empty() {
            return Some("Order must contain at least one line".to_string());
        }
        if self.context.location.trim().is_empty() {
            return Some("Order location cannot be empty".to_string());
        }
        if let Some(index) = self.lines.iter().position(|line| line.quantity == 0) {
            return Some(format!("Line {} has a quantity of zero", index));
        }
        if let Some(index) = self
            .lines
            .iter()
            .position(|line| line.catalog_ref.external_id.is_empty())
        {
            return Some(format!("Line {} has no catalog id", index));
        }
        None
    }
}

/// One image to warm (POST /preload)
#[derive(Debug, Clone, Deserialize)]
pub struct PreloadImage {
    pub url: String,
    pub kind: ImageKind,
    #[serde(default = "default_variant")]
    pub variant: SizeVariant,
}

fn default_variant() -> SizeVariant {
    SizeVariant::Card
}

/// Request body for POST /preload
#[derive(Debug, Clone, Deserialize)]
pub struct PreloadRequest {
    pub images: Vec<PreloadImage>,
}

impl PreloadRequest {
    pub fn validate(&self) -> Option<String> {
        if self.images.is_empty() {
            return Some("No images to preload".to_string());
        }
        if self.images.iter().any(|image| image.url.trim().is_empty()) {
            return Some("Image url cannot be empty".to_string());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDER: &str = r#"{
        "lines": [
            {"catalog_ref": {"external_id": "base1-4", "name": "Charizard"}, "quantity": 1, "unit_price_minor": 35000}
        ],
        "context": {"date": "2024-06-01", "location": "Card show"}
    }"#;

    #[test]
    fn test_submit_order_request_deserialize() {
        let req: SubmitOrderRequest = serde_json::from_str(ORDER).unwrap();
        assert_eq!(req.lines.len(), 1);
        assert_eq!(req.lines[0].catalog_ref.name, "Charizard");
        assert!(req.validate().is_none());
    }

    #[test]
    fn test_validate_zero_quantity() {
        let mut req: SubmitOrderRequest = serde_json::from_str(ORDER).unwrap();
        req.lines[0].quantity = 0;
        assert_eq!(req.validate().unwrap(), "Line 0 has a quantity of zero");
    }

    #[test]
    fn test_validate_empty_order() {
        let mut req: SubmitOrderRequest = serde_json::from_str(ORDER).unwrap();
        req.lines.clear();
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_preload_request_default_variant() {
        let req: PreloadRequest =
            serde_json::from_str(r#"{"images": [{"url": "https://img/1.png", "kind": "card"}]}"#)
                .unwrap();
        assert_eq!(req.images[0].variant, SizeVariant::Card);
        assert_eq!(req.images[0].kind, ImageKind::Card);
        assert!(req.validate().is_none());
    }

    #[test]
    fn test_preload_request_rejects_blank_url() {
        let req: PreloadRequest =
            serde_json::from_str(r#"{"images": [{"url": " ", "kind": "product"}]}"#).unwrap();
        assert!(req.validate().is_some());
    }
}
