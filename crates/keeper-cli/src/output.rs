//! Output formatting for items and fields.

use chrono::{DateTime, Local, Utc};
use comfy_table::presets::NOTHING;
use comfy_table::{ContentArrangement, Table};
use keeper_core::{Field, Item};

use crate::helpers::is_secret;

const MASK: &str = "********";

/// Local, minute-precision timestamp for tables.
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

fn plain_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.to_vec());
    for i in 0..headers.len() {
        if let Some(column) = table.column_mut(i) {
            column.set_padding((0, 2));
        }
    }
    table
}

/// Render the item list. Deleted items are marked when `show_deleted`.
pub fn items_table(items: &[Item], show_deleted: bool) -> String {
    let mut headers = vec!["ID", "NAME", "ICON", "UPDATED"];
    if show_deleted {
        headers.push("DELETED");
    }
    let mut table = plain_table(&headers);
    for item in items {
        let mut row = vec![
            item.id.to_string(),
            item.name.clone(),
            item.icon.clone(),
            format_timestamp(&item.updated),
        ];
        if show_deleted {
            row.push(if item.deleted { "yes" } else { "" }.to_string());
        }
        table.add_row(row);
    }
    table.to_string()
}

/// Render a field list, masking secret values unless `reveal`.
pub fn fields_table(fields: &[Field], reveal: bool) -> String {
    let mut table = plain_table(&["ID", "NAME", "TYPE", "VALUE"]);
    for field in fields {
        table.add_row(vec![
            field.id.to_string(),
            field.name.clone(),
            field.value_type.to_string(),
            display_value(field, reveal),
        ]);
    }
    table.to_string()
}

pub fn display_value(field: &Field, reveal: bool) -> String {
    if !reveal && is_secret(field.value_type) && !field.value.is_empty() {
        MASK.to_string()
    } else {
        field.value.clone()
    }
}

/// Print one item with its fields.
pub fn print_item(item: &Item, reveal: bool, quiet: bool) {
    if !quiet {
        println!("ID: {}", item.id);
        println!("Name: {}", item.name);
        println!("Icon: {}", item.icon);
        println!("Created: {}", format_timestamp(&item.created));
        println!("Updated: {}", format_timestamp(&item.updated));
        println!();
    }
    if item.fields.is_empty() {
        if !quiet {
            println!("No fields.");
        }
        return;
    }
    println!("{}", fields_table(&item.fields, reveal));
}
