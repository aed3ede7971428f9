use boardsync::api::types::{NewComment, NewTask, Priority};
use boardsync::config::Config;
use boardsync::{logging, BoardSync};
use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "boardsync")]
#[command(about = "Cached command-line client for a kanban board API")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/boardsync/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Board to work on (defaults to the configured or first board)
  #[arg(short, long)]
  board: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List boards
  Boards,
  /// List the active board's columns with task counts
  Columns,
  /// List tasks in a column
  Tasks {
    #[arg(long)]
    column: String,
    #[arg(long, default_value = "")]
    search: String,
    #[arg(long, default_value_t = 1)]
    page: u32,
  },
  /// List comments on a task
  Comments {
    #[arg(long)]
    task: String,
  },
  /// Create a task in a column
  CreateTask {
    #[arg(long)]
    column: String,
    #[arg(long)]
    title: String,
    #[arg(long)]
    description: Option<String>,
    /// low, medium or high
    #[arg(long, default_value = "medium")]
    priority: String,
  },
  /// Move a task to another column
  MoveTask {
    #[arg(long)]
    task: String,
    #[arg(long)]
    column: String,
  },
  /// Delete a task
  DeleteTask {
    #[arg(long)]
    task: String,
  },
  /// Comment on a task
  Comment {
    #[arg(long)]
    task: String,
    #[arg(long)]
    body: String,
    #[arg(long, default_value = "anonymous")]
    author: String,
  },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = Config::load(args.config.as_deref())?;

  // Override board if specified on command line
  if let Some(board) = args.board {
    config.default_board = Some(board);
  }

  let _log_guard = logging::init(&config.log)?;

  let mut sync = BoardSync::from_config(&config)?;
  sync.resolve_active_board().await?;

  run(&sync, args.command).await
}

async fn run(sync: &BoardSync, command: Command) -> Result<()> {
  match command {
    Command::Boards => {
      for board in sync.load_boards().await? {
        let marker = if sync.active_board() == Some(&board.id) {
          "*"
        } else {
          " "
        };
        println!("{} {}  {}", marker, board.id, board.name);
      }
    }
    Command::Columns => {
      if sync.active_board().is_none() {
        println!("No boards available");
      }
      for column in sync.load_columns().await? {
        println!("{}  {} ({})", column.id, column.name, column.task_count);
      }
    }
    Command::Tasks {
      column,
      search,
      page,
    } => {
      let mut params = sync.task_params(&column, &search);
      params.page = page.max(1);
      let result = sync.load_tasks(params).await?;
      for task in &result.items {
        println!("{}  [{}]  {}", task.id, task.priority, task.title);
      }
      println!(
        "page {} ({} of {} tasks)",
        result.page,
        result.items.len(),
        result.total
      );
    }
    Command::Comments { task } => {
      for comment in sync.load_comments(&task).await? {
        println!(
          "{}  {}: {}",
          comment.created_at.format("%Y-%m-%d %H:%M"),
          comment.author_name,
          comment.body
        );
      }
    }
    Command::CreateTask {
      column,
      title,
      description,
      priority,
    } => {
      let priority =
        Priority::from_label(&priority).ok_or_else(|| eyre!("Unknown priority: {}", priority))?;
      let task = sync
        .create_task(
          &column,
          NewTask {
            title,
            description,
            priority,
          },
        )
        .await?;
      println!("Created {}  [{}]  {}", task.id, task.priority, task.title);
    }
    Command::MoveTask { task, column } => {
      let task = sync.move_task(&task, &column).await?;
      println!("Moved {} to column {}", task.id, task.column_id);
    }
    Command::DeleteTask { task } => {
      sync.delete_task(&task).await?;
      println!("Deleted {}", task);
    }
    Command::Comment { task, body, author } => {
      let comment = sync
        .add_comment(
          &task,
          NewComment {
            author_name: author,
            body,
          },
        )
        .await?;
      println!("Added comment {} to {}", comment.id, task);
    }
  }

  Ok(())
}
