//! Local task-file subcommands; these feed the sync commands.

use super::CommandResult;
use chrono::Utc;
use clap::Subcommand;
use taskpool_core::sync::timestamp;
use taskpool_core::{Priority, Task};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task to the local list
    Add {
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// low, medium, or high
        #[arg(long)]
        priority: Option<String>,
        /// Deadline as RFC 3339 or YYYY-MM-DD
        #[arg(long)]
        deadline: Option<String>,
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },
    /// List local tasks
    List {
        #[arg(long)]
        json: bool,
    },
    /// Mark a task as completed
    Done { id: String },
}

pub fn run(action: TaskAction) -> CommandResult {
    match action {
        TaskAction::Add {
            title,
            description,
            priority,
            deadline,
            tags,
        } => add(title, description, priority, deadline, tags),
        TaskAction::List { json } => list(json),
        TaskAction::Done { id } => done(&id),
    }
}

fn add(
    title: String,
    description: Option<String>,
    priority: Option<String>,
    deadline: Option<String>,
    tags: Vec<String>,
) -> CommandResult {
    let mut task = Task::new(title);
    if let Some(description) = description {
        task.description = description;
    }
    if let Some(priority) = priority {
        task.priority = Priority::from_str_lenient(&priority);
    }
    if let Some(deadline) = deadline {
        task.deadline = Some(
            timestamp::parse_opt(&deadline)
                .ok_or_else(|| format!("unrecognized deadline: {deadline}"))?,
        );
    }
    task.tags = tags;

    let mut tasks = super::load_tasks()?;
    let id = task.id.clone();
    tasks.push(task);
    super::save_tasks(&tasks)?;
    println!("task added: {id}");
    Ok(())
}

fn list(json: bool) -> CommandResult {
    let tasks = super::load_tasks()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&tasks)?);
        return Ok(());
    }
    if tasks.is_empty() {
        println!("no tasks");
        return Ok(());
    }
    for task in &tasks {
        let mark = if task.completed { "x" } else { " " };
        let priority = serde_json::to_value(task.priority)?;
        println!(
            "[{mark}] {}  {} ({})",
            task.id,
            task.title,
            priority.as_str().unwrap_or("medium")
        );
    }
    Ok(())
}

fn done(id: &str) -> CommandResult {
    let mut tasks = super::load_tasks()?;
    let Some(task) = tasks.iter_mut().find(|t| t.id == id) else {
        return Err(format!("no such task: {id}").into());
    };
    task.completed = true;
    task.updated_at = Utc::now();
    super::save_tasks(&tasks)?;
    println!("task completed: {id}");
    Ok(())
}
