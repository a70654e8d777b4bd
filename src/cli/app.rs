//! CLI module for the contentvault application
//!
//! This module handles the command-line interface for interacting with the
//! item store.
use std::{
    fs::{read_to_string, OpenOptions},
    io::{stdin, stdout, Write},
    path::{Path, PathBuf},
    process::Command,
};

use log::{debug, info};
use serde_json::json;
use shell_words::split;
use tempfile::Builder;
use url::Url;

use crate::{
    parse_tags, Commands, Config, DateBound, Item, ItemStore, NewItem, Result, SaveResult,
    SearchFilter, VaultError,
};

/// CLI Application handler - processes CLI commands and interfaces with ItemStore
pub struct App {
    /// The item store backend
    store: ItemStore,

    /// Application configuration
    config: Config,

    /// Whether to display verbose output
    verbose: bool,
}

impl App {
    /// Create a new CLI application with the given store and config
    pub fn new(store: ItemStore, config: Config, verbose: bool) -> Self {
        Self {
            store,
            config,
            verbose,
        }
    }

    /// Run the CLI application with the given command
    pub fn run(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Note {
                body,
                title,
                edit,
                tags,
                file,
            } => self.save_note(title, body, file, tags, edit)?,

            Commands::Link {
                url,
                title,
                comment,
                tags,
            } => self.save_link(url, title, comment, tags)?,

            Commands::Search {
                query,
                tags,
                from,
                to,
                limit,
                json,
            } => self.handle_search(query, tags, from, to, limit, json)?,

            Commands::Recent { days, limit, json } => self.list_recent(days, limit, json)?,

            Commands::List { json } => {
                let items = self.store.get_all_items();
                self.display_items(&items, json)?;
            }

            Commands::Show { id, json } => self.show_item(&id, json)?,

            Commands::Delete { id, force } => self.handle_delete(id, force)?,

            Commands::Tags { json } => self.list_tags(json)?,
        }

        Ok(())
    }

    fn save_note(
        &mut self,
        title: Option<String>,
        body: Option<String>,
        file: Option<PathBuf>,
        tags: Option<String>,
        open_editor: bool,
    ) -> Result<()> {
        let body = match (body, file) {
            (Some(b), _) => b,
            (_, Some(file_path)) => {
                if !file_path.exists() {
                    return Err(VaultError::InvalidItem {
                        message: format!("file not found: {}", file_path.display()),
                    });
                }
                read_to_string(file_path)?
            }
            (None, None) if open_editor => {
                self.open_editor_for_content(title.as_deref().unwrap_or("New note"))?
            }
            (None, None) => String::new(),
        };

        if body.trim().is_empty() {
            return Err(VaultError::InvalidItem {
                message: "body text is required for notes".to_string(),
            });
        }

        let mut candidate = NewItem::note(body).with_tags(parse_tags(tags));
        candidate.title = title;

        let result = self.store.save_item(candidate)?;
        self.print_save_result(&result);
        Ok(())
    }

    fn save_link(
        &mut self,
        url: String,
        title: Option<String>,
        comment: Option<String>,
        tags: Option<String>,
    ) -> Result<()> {
        let url = url.trim().to_string();
        if let Err(e) = Url::parse(&url) {
            return Err(VaultError::InvalidItem {
                message: format!("invalid URL format '{}': {}", url, e),
            });
        }

        let mut candidate = NewItem::link(url).with_tags(parse_tags(tags));
        candidate.title = title;
        candidate.body = comment;

        let result = self.store.save_item(candidate)?;
        self.print_save_result(&result);
        Ok(())
    }

    fn print_save_result(&self, result: &SaveResult) {
        let item = &result.item;
        let tags = if item.tags.is_empty() {
            "none".to_string()
        } else {
            item.tags.join(", ")
        };

        if result.is_duplicate {
            println!("{}", console::style("This link is already saved").yellow());
            println!("   Title: {}", item.display_title());
            println!("   Tags:  {}", tags);
            println!("   ID:    {}", item.id);
        } else {
            println!("{}", console::style("Saved").green().bold());
            println!("   Type:  {}", item.kind);
            if let Some(title) = &item.title {
                println!("   Title: \"{}\"", title);
            }
            if let Some(url) = &item.url {
                println!("   URL:   {}", url);
            }
            println!("   Tags:  {}", tags);
            println!("   ID:    {}", item.id);
            println!(
                "   Saved: {}",
                item.created_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }

        if !self.store.is_durable() {
            eprintln!(
                "{}",
                console::style("Warning: storage is not writable, this change is held in memory only")
                    .red()
            );
        }
    }

    fn handle_search(
        &self,
        query: Option<String>,
        tags: Vec<String>,
        from: Option<String>,
        to: Option<String>,
        limit: usize,
        json: bool,
    ) -> Result<()> {
        let mut filter = SearchFilter::new().tags(tags);
        filter.query = query.clone();
        if let Some(from) = from {
            filter = filter.date_from(from.parse::<DateBound>()?);
        }
        if let Some(to) = to {
            filter = filter.date_to(to.parse::<DateBound>()?);
        }

        let mut results = self.store.search_items(&filter);
        let total = results.len();

        // 0 means no limit
        if limit > 0 {
            results.truncate(limit);
        }

        if results.is_empty() && !json {
            match query {
                Some(q) => println!("No items found matching query: \"{}\"", q),
                None => println!("No items found matching the criteria."),
            }
            return Ok(());
        }

        self.display_items(&results, json)?;
        if !json && results.len() < total {
            println!(
                "Showing {} of {} matching items. Use --limit to show more.",
                results.len(),
                total
            );
        }
        Ok(())
    }

    fn list_recent(&self, days: Option<u32>, limit: Option<usize>, json: bool) -> Result<()> {
        let days = days.unwrap_or(self.config.recent_days);
        debug!("Listing items from the last {} days", days);

        let items = self.store.get_recent_items(days, limit);
        if items.is_empty() && !json {
            println!("Nothing saved in the last {} days.", days);
            return Ok(());
        }
        self.display_items(&items, json)
    }

    fn show_item(&self, id: &str, json: bool) -> Result<()> {
        let item = self
            .store
            .get_item_by_id(id)
            .ok_or_else(|| VaultError::ItemNotFound { id: id.to_string() })?;

        if json {
            println!("{}", serde_json::to_string_pretty(item)?);
        } else {
            self.display_item_text(item, true);
        }
        Ok(())
    }

    fn list_tags(&self, json: bool) -> Result<()> {
        let tags = self.store.all_tags();

        if json {
            let value: Vec<serde_json::Value> = tags
                .iter()
                .map(|(tag, count)| json!({ "tag": tag, "count": count }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&value)?);
            return Ok(());
        }

        if tags.is_empty() {
            println!("No tags yet.");
            return Ok(());
        }
        for (tag, count) in tags {
            println!("{} ({})", console::style(format!("#{}", tag)).cyan(), count);
        }
        Ok(())
    }

    /// Display items in the requested format
    fn display_items(&self, items: &[Item], json: bool) -> Result<()> {
        if json {
            println!("{}", serde_json::to_string_pretty(items)?);
            return Ok(());
        }

        if items.is_empty() {
            println!("No items saved yet.");
            return Ok(());
        }

        // Use terminal width for formatting if available
        let term_width = terminal_size::terminal_size()
            .map(|(w, _)| w.0 as usize)
            .unwrap_or(80);

        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                println!("{}", "-".repeat(term_width.min(50)));
            }
            self.display_item_text(item, self.verbose);
        }

        println!(
            "\nFound {} item{}",
            items.len(),
            if items.len() == 1 { "" } else { "s" }
        );
        Ok(())
    }

    fn display_item_text(&self, item: &Item, detailed: bool) {
        println!(
            "ID: {} | {} | Created: {}",
            item.id,
            item.kind,
            item.created_at.format("%Y-%m-%d %H:%M")
        );
        println!("Title: {}", console::style(item.display_title()).bold());

        if let Some(url) = &item.url {
            println!("URL: {}", console::style(url).underlined());
        }

        if !item.tags.is_empty() {
            let tags = item
                .tags
                .iter()
                .map(|tag| format!("#{}", tag))
                .collect::<Vec<_>>()
                .join(" ");

            println!("Tags: {}", console::style(tags).cyan());
        }

        if let Some(body) = &item.body {
            if detailed {
                println!("\n{}", body);
            } else {
                let preview = get_content_preview(body, 100);
                if !preview.is_empty() {
                    println!("\n{}", preview);
                }
            }
        }

        if detailed {
            if let Some(updated_at) = item.updated_at {
                println!("Updated: {}", updated_at.format("%Y-%m-%d %H:%M"));
            }
        }
    }

    fn handle_delete(&mut self, id: String, force: bool) -> Result<()> {
        let item = self
            .store
            .get_item_by_id(&id)
            .cloned()
            .ok_or_else(|| VaultError::ItemNotFound { id: id.clone() })?;

        if !force {
            println!("You are about to delete the following item:");
            self.display_item_text(&item, false);

            print!("\nAre you sure you want to delete this item? [y/N]: ");
            stdout().flush()?;

            let mut input = String::new();
            stdin().read_line(&mut input)?;

            let input = input.trim().to_lowercase();
            if input != "y" && input != "yes" {
                println!("Deletion cancelled.");
                return Ok(());
            }
        }

        if self.store.delete_item(&id) {
            println!(
                "Item '{}' ({}) has been permanently deleted.",
                item.display_title(),
                item.id
            );
        }
        Ok(())
    }

    fn open_editor_for_content(&self, title: &str) -> Result<String> {
        let temp_file = Builder::new().suffix(".md").tempfile()?;
        let temp_path = temp_file.path().to_path_buf();

        let editor_cmd = self.config.get_editor_command();
        self.write_editor_template(&temp_path, title)?;

        info!("Opening editor to write note content. Save and exit when done...");
        self.launch_editor(&editor_cmd, &temp_path)?;

        let content = read_to_string(&temp_path)?;
        Ok(process_editor_content(&content))
    }

    fn write_editor_template(&self, path: &Path, title: &str) -> Result<()> {
        let mut file = OpenOptions::new().write(true).open(path)?;

        writeln!(file, "<!-- ")?;
        writeln!(file, "Write the body of \"{}\" below.", title)?;
        writeln!(
            file,
            "Lines that start with <!-- and end with --> are comments and will be ignored."
        )?;
        writeln!(file, "Save and exit the editor when you're done.")?;
        writeln!(file, "-->")?;
        writeln!(file)?;

        Ok(())
    }

    fn launch_editor(&self, editor_cmd: &str, file_path: &Path) -> Result<()> {
        let args = split(editor_cmd).map_err(|e| VaultError::EditorError {
            message: format!("Failed to parse editor command: {}", e),
        })?;

        let Some((program, rest)) = args.split_first() else {
            return Err(VaultError::EditorError {
                message: "Empty editor command".to_string(),
            });
        };

        let status = Command::new(program).args(rest).arg(file_path).status()?;

        if !status.success() {
            return Err(VaultError::EditorError {
                message: "Editor exited with non-zero status".to_string(),
            });
        }

        Ok(())
    }
}

/// Strips the template's comment block from editor output.
fn process_editor_content(content: &str) -> String {
    let mut in_comment = false;
    let mut kept = Vec::new();

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("<!--") {
            in_comment = true;
        }
        if !in_comment {
            kept.push(line);
        }
        if trimmed.ends_with("-->") {
            in_comment = false;
        }
    }

    kept.join("\n").trim().to_string()
}

/// First non-empty line, cut to `max_chars` characters.
fn get_content_preview(content: &str, max_chars: usize) -> String {
    let first_line = content
        .lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("");

    if first_line.chars().count() <= max_chars {
        first_line.to_string()
    } else {
        let cut: String = first_line.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editor_comments_are_removed() {
        let raw = "<!-- \nWrite the body below.\n-->\n\nActual note\nsecond line\n";
        assert_eq!(process_editor_content(raw), "Actual note\nsecond line");
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let body = "\n\nünïcödé text that goes on";
        assert_eq!(get_content_preview(body, 7), "ünïcödé...");
        assert_eq!(get_content_preview("short", 100), "short");
        assert_eq!(get_content_preview("", 10), "");
    }
}
