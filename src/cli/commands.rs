use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use crate::app::{App, PendingDelete};
use crate::model::TagId;
use crate::present::ContactView;
use crate::ui;

use super::Commands;

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Only show contacts carrying this tag id
    #[arg(long)]
    pub tag: Option<TagId>,
    /// Oldest first
    #[arg(long)]
    pub asc: bool,
}

#[derive(Args, Debug, Clone)]
pub struct GridArgs {
    /// Oldest first within each group
    #[arg(long)]
    pub asc: bool,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    pub name: String,
    /// YYYY-MM-DD or MM/DD/YYYY (defaults to the configured date)
    #[arg(long)]
    pub date: Option<String>,
    /// Tag id to attach
    #[arg(long)]
    pub tag: Option<TagId>,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    /// Current name of the contact
    pub name: String,
    /// New name (the contact is deleted and re-created under it)
    #[arg(long)]
    pub rename: Option<String>,
    /// YYYY-MM-DD or MM/DD/YYYY
    #[arg(long)]
    pub date: Option<String>,
    /// Tag id to attach
    #[arg(long, conflicts_with = "untag")]
    pub tag: Option<TagId>,
    /// Remove the contact's tag
    #[arg(long)]
    pub untag: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    pub name: String,
    /// Skip the confirmation prompt
    #[arg(long)]
    pub yes: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum TagCommand {
    /// Print all tags
    List,
    /// Create a tag
    Add(TagAddArgs),
    /// Rename or recolor a tag
    Edit(TagEditArgs),
    /// Delete a tag (contacts keep a dangling reference)
    Delete(TagDeleteArgs),
}

#[derive(Args, Debug, Clone)]
pub struct TagAddArgs {
    pub name: String,
    /// Badge color, e.g. #6366f1 (defaults to the configured gray)
    #[arg(long)]
    pub color: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct TagEditArgs {
    pub id: TagId,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub color: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct TagDeleteArgs {
    pub id: TagId,
    /// Skip the confirmation prompt
    #[arg(long)]
    pub yes: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TagArgs {
    #[command(subcommand)]
    pub command: TagCommand,
}

/// Runs one command against the app and prints the outcome to `out`. Returns
/// false when the command ended on an error notice.
pub async fn dispatch<W: Write>(app: &mut App, command: Commands, out: &mut W) -> Result<bool> {
    match command {
        Commands::List(args) => list_contacts(app, args, out).await,
        Commands::Grid(args) => grid_contacts(app, args, out).await,
        Commands::Add(args) => add_contact(app, args, out).await,
        Commands::Edit(args) => edit_contact(app, args, out).await,
        Commands::Delete(args) => delete_contact(app, args, out).await,
        Commands::Tags(args) => handle_tag_command(app, args, out).await,
    }
}

async fn list_contacts<W: Write>(app: &mut App, args: ListArgs, out: &mut W) -> Result<bool> {
    if !app.start().await {
        return finish(app, out);
    }
    if args.asc && !app.toggle_sort().await {
        return finish(app, out);
    }
    if args.tag.is_some() && !app.select_tag(args.tag).await {
        return finish(app, out);
    }
    if let Some(ContactView::List(view)) = app.view() {
        write!(out, "{}", ui::render_list(view, app.state().tags()))?;
    }
    finish(app, out)
}

async fn grid_contacts<W: Write>(app: &mut App, args: GridArgs, out: &mut W) -> Result<bool> {
    if !app.refresh_tags().await || !app.show_grid().await {
        return finish(app, out);
    }
    if args.asc && !app.toggle_sort().await {
        return finish(app, out);
    }
    if let Some(ContactView::Grid(view)) = app.view() {
        write!(out, "{}", ui::render_grid(view))?;
    }
    finish(app, out)
}

async fn add_contact<W: Write>(app: &mut App, args: AddArgs, out: &mut W) -> Result<bool> {
    if !app.start().await {
        return finish(app, out);
    }
    let Some(mut form) = app.open_add_contact().await else {
        return finish(app, out);
    };
    form.name = args.name;
    if let Some(date) = args.date {
        form.date = date;
    }
    form.tag_id = args.tag;
    app.submit_add_contact(&form).await;
    finish(app, out)
}

async fn edit_contact<W: Write>(app: &mut App, args: EditArgs, out: &mut W) -> Result<bool> {
    if !app.start().await {
        return finish(app, out);
    }
    let Some(mut form) = app.open_edit_contact(&args.name).await else {
        return finish(app, out);
    };
    if let Some(name) = args.rename {
        form.name = name;
    }
    if let Some(date) = args.date {
        form.date = date;
    }
    if args.untag {
        form.tag_id = None;
    } else if args.tag.is_some() {
        form.tag_id = args.tag;
    }
    app.submit_edit_contact(&form).await;
    finish(app, out)
}

async fn delete_contact<W: Write>(
    app: &mut App,
    args: DeleteArgs,
    out: &mut W,
) -> Result<bool> {
    app.request_delete_contact(&args.name);
    if !args.yes && !confirm(&delete_question(app))? {
        app.cancel_delete();
        writeln!(out, "Cancelled.")?;
        return Ok(true);
    }
    app.confirm_delete().await;
    finish(app, out)
}

async fn handle_tag_command<W: Write>(
    app: &mut App,
    args: TagArgs,
    out: &mut W,
) -> Result<bool> {
    match args.command {
        TagCommand::List => {
            let legend = app.open_tags().await;
            if app.state().notice().is_none() {
                write!(out, "{}", ui::render_legend(&legend))?;
            }
            finish(app, out)
        }
        TagCommand::Add(args) => {
            let Some(mut form) = app.open_add_tag().await else {
                return finish(app, out);
            };
            form.name = args.name;
            if let Some(color) = args.color {
                form.color = color;
            }
            app.submit_add_tag(&form).await;
            finish(app, out)
        }
        TagCommand::Edit(args) => {
            if !app.refresh_tags().await {
                return finish(app, out);
            }
            let Some(mut form) = app.open_edit_tag(args.id) else {
                return finish(app, out);
            };
            if let Some(name) = args.name {
                form.name = name;
            }
            if let Some(color) = args.color {
                form.color = color;
            }
            app.submit_edit_tag(&form).await;
            finish(app, out)
        }
        TagCommand::Delete(args) => {
            if !app.refresh_tags().await || !app.request_delete_tag(args.id) {
                return finish(app, out);
            }
            if !args.yes && !confirm(&delete_question(app))? {
                app.cancel_delete();
                writeln!(out, "Cancelled.")?;
                return Ok(true);
            }
            app.confirm_delete().await;
            finish(app, out)
        }
    }
}

/// Prints the pending notice, if any. False when it reports an error.
fn finish<W: Write>(app: &mut App, out: &mut W) -> Result<bool> {
    let Some(notice) = app.take_notice() else {
        return Ok(true);
    };
    writeln!(out, "{}", ui::render_notice(&notice)).context("writing notice")?;
    if notice.is_error() {
        tracing::error!(kind = ?notice.kind, message = %notice.message, "command failed");
        Ok(false)
    } else {
        Ok(true)
    }
}

fn delete_question(app: &App) -> String {
    match app.state().pending_delete() {
        Some(PendingDelete::Contact { name }) => format!("Delete contact {name}?"),
        Some(PendingDelete::Tag { name, .. }) => format!("Delete tag {name}?"),
        None => "Delete?".to_owned(),
    }
}

fn confirm(question: &str) -> Result<bool> {
    if !atty::is(atty::Stream::Stdin) {
        bail!("refusing to delete without --yes: stdin is not a terminal");
    }
    let answer = prompt(&format!("{question} [y/N]"))?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn prompt(label: &str) -> Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{}: ", label)?;
    stdout.flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim_end().to_owned())
}
