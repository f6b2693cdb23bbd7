//! Item and field validation.
//!
//! Pure checks run by the session before any encryption or I/O.

use crate::catalog::{IconCatalog, ValueType};
use crate::error::{KeeperError, Result};
use crate::storage::types::{NewField, NewItem, UpdateItem};

/// Validate a field before it is inserted.
pub fn validate_field(field: &NewField, icons: &dyn IconCatalog) -> Result<()> {
    if !icons.contains(&field.icon) {
        return Err(KeeperError::Validation("icon not found".to_string()));
    }
    if field.value_type.parse::<ValueType>().is_err() {
        return Err(KeeperError::Validation("value type not found".to_string()));
    }
    if field.name.is_empty() {
        return Err(KeeperError::Validation(
            "field name cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validate a new item before it is inserted.
pub fn validate_new_item(item: &NewItem, icons: &dyn IconCatalog) -> Result<()> {
    if item.name.is_empty() {
        return Err(KeeperError::Validation(
            "item name cannot be empty".to_string(),
        ));
    }
    if !icons.contains(&item.icon) {
        return Err(KeeperError::IconNotFound(item.icon.clone()));
    }
    Ok(())
}

/// Validate an item update. A request that changes nothing is rejected.
pub fn validate_item_update(update: &UpdateItem, icons: &dyn IconCatalog) -> Result<()> {
    validate_item_id(update.id)?;

    if update.new_name().is_none() && update.new_icon().is_none() {
        return Err(KeeperError::Validation(
            "nothing to update: name and icon are both empty".to_string(),
        ));
    }
    if let Some(icon) = update.new_icon() {
        if !icons.contains(icon) {
            return Err(KeeperError::IconNotFound(icon.to_string()));
        }
    }
    Ok(())
}

/// Item ids are assigned by the store starting at 1.
pub fn validate_item_id(id: i64) -> Result<()> {
    if id <= 0 {
        return Err(KeeperError::InvalidItemId(id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::BuiltinIcons;

    #[test]
    fn test_valid_field() {
        let field = NewField::new("Login", "fa-user", "text", "alice");
        assert!(validate_field(&field, &BuiltinIcons).is_ok());
    }

    #[test]
    fn test_field_checks_in_order() {
        let bad_icon = NewField::new("", "nope", "bogus", "");
        let err = validate_field(&bad_icon, &BuiltinIcons).unwrap_err();
        assert!(err.to_string().contains("icon not found"));

        let bad_type = NewField::new("", "fa-user", "bogus", "");
        let err = validate_field(&bad_type, &BuiltinIcons).unwrap_err();
        assert!(err.to_string().contains("value type not found"));

        let no_name = NewField::new("", "fa-user", "password", "");
        let err = validate_field(&no_name, &BuiltinIcons).unwrap_err();
        assert!(err.to_string().contains("field name cannot be empty"));
    }

    #[test]
    fn test_new_item() {
        assert!(validate_new_item(&NewItem::new("Bank", "fa-bank"), &BuiltinIcons).is_ok());
        assert!(matches!(
            validate_new_item(&NewItem::new("", "fa-bank"), &BuiltinIcons),
            Err(KeeperError::Validation(_))
        ));
        assert!(matches!(
            validate_new_item(&NewItem::new("Bank", "bank"), &BuiltinIcons),
            Err(KeeperError::IconNotFound(icon)) if icon == "bank"
        ));
    }

    #[test]
    fn test_update_requires_positive_id() {
        let update = UpdateItem::new(0).with_name("x");
        assert!(matches!(
            validate_item_update(&update, &BuiltinIcons),
            Err(KeeperError::InvalidItemId(0))
        ));
        let update = UpdateItem::new(-5).with_name("x");
        assert!(matches!(
            validate_item_update(&update, &BuiltinIcons),
            Err(KeeperError::InvalidItemId(-5))
        ));
    }

    #[test]
    fn test_update_rejects_no_op() {
        let update = UpdateItem::new(1).with_name("").with_icon("");
        assert!(matches!(
            validate_item_update(&update, &BuiltinIcons),
            Err(KeeperError::Validation(_))
        ));
        assert!(validate_item_update(&UpdateItem::new(1), &BuiltinIcons).is_err());
    }

    #[test]
    fn test_update_checks_supplied_icon() {
        let update = UpdateItem::new(1).with_icon("fa-nope");
        assert!(matches!(
            validate_item_update(&update, &BuiltinIcons),
            Err(KeeperError::IconNotFound(_))
        ));
        let update = UpdateItem::new(1).with_name("Renamed");
        assert!(validate_item_update(&update, &BuiltinIcons).is_ok());
    }
}
