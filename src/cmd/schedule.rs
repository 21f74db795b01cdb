//! Task scheduling commands: `bvs schedule`, `bvs validate`, `bvs ready`.

use anyhow::{Context, Result};
use bvs::dag::{GraphLimits, TaskScheduler, get_ready_tasks};
use bvs_common::TaskDescriptor;
use console::style;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// Task files hold either a bare array or `{ "tasks": [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum TaskFile {
    List(Vec<TaskDescriptor>),
    Wrapped { tasks: Vec<TaskDescriptor> },
}

pub fn load_tasks(path: &Path) -> Result<Vec<TaskDescriptor>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read task file: {}", path.display()))?;
    let file: TaskFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse task file: {}", path.display()))?;
    Ok(match file {
        TaskFile::List(tasks) | TaskFile::Wrapped { tasks } => tasks,
    })
}

/// Level tasks into parallel groups. Returns false when the schedule has issues.
pub fn cmd_schedule(tasks_file: &Path, limits: GraphLimits, json: bool) -> Result<bool> {
    let tasks = load_tasks(tasks_file)?;
    let report = TaskScheduler::with_limits(limits).schedule(&tasks)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(report.is_valid());
    }

    println!();
    println!(
        "{} tasks in {} parallel group(s)",
        report.tasks.len(),
        report.group_count
    );
    println!();
    for (group, ids) in report.waves().iter().enumerate() {
        println!("  {} {}", style(format!("Group {}:", group)).bold(), ids.join(", "));
    }
    print_issues(&report.issues);

    Ok(report.is_valid())
}

/// Validate a task file. Returns false when issues are found.
pub fn cmd_validate(tasks_file: &Path, limits: GraphLimits) -> Result<bool> {
    let tasks = load_tasks(tasks_file)?;
    let issues = TaskScheduler::with_limits(limits).validate(&tasks);

    if issues.is_empty() {
        println!("{} {} tasks, no issues", style("✓").green(), tasks.len());
    } else {
        print_issues(&issues);
    }
    Ok(issues.is_empty())
}

/// List tasks whose dependencies are all completed.
pub fn cmd_ready(tasks_file: &Path, completed: &[String], json: bool) -> Result<()> {
    let tasks = load_tasks(tasks_file)?;
    let completed: HashSet<String> = completed
        .iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect();
    let ready = get_ready_tasks(&tasks, &completed);

    if json {
        println!("{}", serde_json::to_string_pretty(&ready)?);
        return Ok(());
    }

    if ready.is_empty() {
        println!("No tasks are ready.");
    }
    for task in ready {
        if task.title.is_empty() {
            println!("{}", task.id);
        } else {
            println!("{}  {}", task.id, style(&task.title).dim());
        }
    }
    Ok(())
}

fn print_issues(issues: &[String]) {
    if issues.is_empty() {
        return;
    }
    println!();
    println!("{}", style(format!("{} issue(s):", issues.len())).red().bold());
    for issue in issues {
        println!("  - {}", issue);
    }
}
