use dialoguer::Confirm;
use keeper_core::{NewField, NewItem};

use crate::app::AppContext;
use crate::cli::{AddArgs, FieldArgs, ListArgs, ShowArgs};
use crate::helpers::{is_interactive, read_field_value};
use crate::output::{items_table, print_item};

pub fn handle_add(ctx: &AppContext, args: &AddArgs) -> anyhow::Result<()> {
    let session = ctx.open_unlocked()?;
    let added = session.add_new_item(NewItem::new(&args.name, &args.icon))?;
    session.close()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&added)?);
    } else if !ctx.quiet() {
        println!("Added item {}", added.item_id);
    }
    Ok(())
}

pub fn handle_field(ctx: &AppContext, args: &FieldArgs) -> anyhow::Result<()> {
    let session = ctx.open_unlocked()?;
    let value = read_field_value(args.value.clone(), &args.value_type, is_interactive())?;
    let added = session.add_new_field(
        args.item_id,
        NewField::new(&args.name, &args.icon, &args.value_type, value),
    )?;
    session.close()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&added)?);
    } else if !ctx.quiet() {
        println!("Added field {} to item {}", added.field_id, args.item_id);
    }
    Ok(())
}

pub fn handle_list(ctx: &AppContext, args: &ListArgs) -> anyhow::Result<()> {
    let session = ctx.open_unlocked()?;
    let items = if args.all {
        session.read_all_items_including_deleted()?
    } else {
        session.read_all_items()?
    };
    session.close()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }
    if items.is_empty() {
        if !ctx.quiet() {
            println!("No items.");
        }
        return Ok(());
    }
    println!("{}", items_table(&items, args.all));
    Ok(())
}

pub fn handle_show(ctx: &AppContext, args: &ShowArgs) -> anyhow::Result<()> {
    let session = ctx.open_unlocked()?;
    let item = session.read_item_by_id(args.id)?;
    session.close()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&item)?);
    } else {
        print_item(&item, args.reveal, ctx.quiet());
    }
    Ok(())
}

pub fn handle_rename(ctx: &AppContext, id: i64, name: &str) -> anyhow::Result<()> {
    let session = ctx.open_unlocked()?;
    session.update_item_name(id, name)?;
    session.close()?;

    if !ctx.quiet() {
        println!("Renamed item {}", id);
    }
    Ok(())
}

pub fn handle_icon(ctx: &AppContext, id: i64, icon: &str) -> anyhow::Result<()> {
    let session = ctx.open_unlocked()?;
    session.update_item_icon(id, icon)?;
    session.close()?;

    if !ctx.quiet() {
        println!("Changed icon of item {} to {}", id, icon);
    }
    Ok(())
}

pub fn handle_delete(ctx: &AppContext, id: i64, yes: bool) -> anyhow::Result<()> {
    let session = ctx.open_unlocked()?;
    if !yes && is_interactive() {
        let item = session.read_item_by_id(id)?;
        let proceed = Confirm::new()
            .with_prompt(format!("Delete item {} ({})?", id, item.name))
            .default(false)
            .interact()?;
        if !proceed {
            return Err(anyhow::anyhow!("Delete cancelled"));
        }
    }
    session.delete_item(id)?;
    session.close()?;

    if !ctx.quiet() {
        println!("Deleted item {}", id);
    }
    Ok(())
}
