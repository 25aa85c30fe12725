//! Watch command implementation - Interactive TUI.
//!
//! Renders the grid live and turns key presses into the simulation's
//! command vocabulary: select, attack, split, deselect. The wall-clock tick
//! cadence lives here; the core only ever sees discrete `step()` calls.

// CLI watch uses intentional casts for display and timing
#![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]

use super::{CliError, seed_or_entropy};
use annex::{CommandOutcome, Faction, Occupation, Pos, Rng, Sim};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use std::io::stdout;
use std::time::{Duration, Instant};

/// Execute the watch command.
///
/// # Errors
///
/// Returns an error if the simulation or the TUI fails.
pub(crate) fn execute(
    seed: Option<u64>,
    width: u16,
    height: u16,
    speed: u64,
) -> Result<(), CliError> {
    let seed = seed_or_entropy(seed);
    let mut rng = Rng::new(seed);

    let mut sim = Sim::new(width, height)?;
    let (red_start, _) = sim.seed_factions(&mut rng)?;

    run_tui(App::new(sim, seed, speed, red_start))
}

/// App state for the TUI.
struct App {
    sim: Sim,
    seed: u64,
    speed_ms: u64,
    cursor: Pos,
    status: String,
    last_step: Instant,
}

impl App {
    fn new(mut sim: Sim, seed: u64, speed_ms: u64, cursor: Pos) -> Self {
        sim.set_paused(true); // Start paused
        Self {
            sim,
            seed,
            speed_ms,
            cursor,
            status: String::from("paused - space to run"),
            last_step: Instant::now(),
        }
    }

    fn step_once(&mut self) -> Result<(), CliError> {
        // A paused driver skips ticks outright, so single-stepping lifts
        // the flag around one call.
        let paused = self.sim.is_paused();
        self.sim.set_paused(false);
        self.sim.step()?;
        self.sim.set_paused(paused);
        self.last_step = Instant::now();
        Ok(())
    }

    fn toggle_pause(&mut self) {
        let paused = !self.sim.is_paused();
        self.sim.set_paused(paused);
        self.status = if paused {
            String::from("paused")
        } else {
            String::from("running")
        };
    }

    fn increase_speed(&mut self) {
        self.speed_ms = self.speed_ms.saturating_sub(100).max(50);
    }

    fn decrease_speed(&mut self) {
        self.speed_ms = (self.speed_ms + 100).min(2000);
    }

    fn should_auto_step(&self) -> bool {
        !self.sim.is_paused()
            && self.last_step.elapsed() >= Duration::from_millis(self.speed_ms)
    }

    fn move_cursor(&mut self, dx: i32, dy: i32) {
        let grid = self.sim.world().grid();
        let x = (i32::from(self.cursor.x) + dx)
            .clamp(0, i32::from(grid.width()) - 1);
        let y = (i32::from(self.cursor.y) + dy)
            .clamp(0, i32::from(grid.height()) - 1);
        self.cursor = Pos::new(x as u16, y as u16);
    }

    fn select_cursor(&mut self) {
        match self.sim.select(self.cursor) {
            Ok(()) => self.status = format!("selected {}", self.cursor),
            Err(e) => self.status = e.to_string(),
        }
    }

    fn attack_cursor(&mut self) {
        match self.sim.attack(self.cursor) {
            Ok(outcome) => self.status = describe_outcome("attack", outcome),
            Err(e) => self.status = e.to_string(),
        }
    }

    fn split_cursor(&mut self) {
        match self.sim.split(self.cursor) {
            Ok(outcome) => self.status = describe_outcome("split", outcome),
            Err(e) => self.status = e.to_string(),
        }
    }
}

fn describe_outcome(verb: &str, outcome: CommandOutcome) -> String {
    match outcome {
        CommandOutcome::Merged { moved } => format!("merged {moved} troops"),
        CommandOutcome::Captured { moved } => format!("captured with {moved} troops"),
        CommandOutcome::AttackPending => String::from("attack underway"),
        CommandOutcome::Split { moved } => format!("split {moved} troops"),
        CommandOutcome::Ignored => format!("{verb} ignored"),
    }
}

fn run_tui(mut app: App) -> Result<(), CliError> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).map_err(|e| CliError::new(e.to_string()))?;

    let result = event_loop(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    app: &mut App,
) -> Result<(), CliError> {
    loop {
        // Draw
        terminal
            .draw(|f| ui(f, app))
            .map_err(|e| CliError::new(e.to_string()))?;

        // Auto-step if needed
        if app.should_auto_step() {
            app.sim.step()?;
            app.last_step = Instant::now();
        }

        // Handle input with timeout
        if event::poll(Duration::from_millis(50)).map_err(|e| CliError::new(e.to_string()))?
            && let Event::Key(key) = event::read().map_err(|e| CliError::new(e.to_string()))?
            && key.kind == KeyEventKind::Press
        {
            match key.code {
                KeyCode::Char('q') => break,
                KeyCode::Char(' ') => app.toggle_pause(),
                KeyCode::Char('n') => app.step_once()?,
                KeyCode::Up | KeyCode::Char('k') => app.move_cursor(0, -1),
                KeyCode::Down | KeyCode::Char('j') => app.move_cursor(0, 1),
                KeyCode::Left | KeyCode::Char('h') => app.move_cursor(-1, 0),
                KeyCode::Right | KeyCode::Char('l') => app.move_cursor(1, 0),
                KeyCode::Enter => app.select_cursor(),
                KeyCode::Esc => {
                    app.sim.deselect();
                    app.status = String::from("deselected");
                }
                KeyCode::Char('a') => app.attack_cursor(),
                KeyCode::Char('s') => app.split_cursor(),
                KeyCode::Char('+' | '=') => app.increase_speed(),
                KeyCode::Char('-') => app.decrease_speed(),
                _ => {}
            }
        }
    }
    Ok(())
}

fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(10),   // Main content
            Constraint::Length(3), // Footer
        ])
        .split(f.area());

    // Header
    render_header(f, chunks[0], app);

    // Main content - map and stats
    let main_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[1]);

    render_map(f, main_chunks[0], app);
    render_stats(f, main_chunks[1], app);

    // Footer
    render_footer(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let state = if app.sim.is_paused() { "PAUSED" } else { "RUNNING" };
    let title = format!(
        " Annex | Tick {} | {} | Speed: {}ms | Seed: {} ",
        app.sim.ticks(),
        state,
        app.speed_ms,
        app.seed
    );

    let header = Paragraph::new(title)
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL));

    f.render_widget(header, area);
}

fn render_map(f: &mut Frame, area: Rect, app: &App) {
    let grid = app.sim.world().grid();
    let mut lines: Vec<Line> = Vec::new();

    let visible_width = (area.width as usize / 2).saturating_sub(1).min(grid.width() as usize);
    let visible_height = (area.height as usize).saturating_sub(2).min(grid.height() as usize);

    for y in 0..visible_height {
        let mut spans = Vec::new();
        for x in 0..visible_width {
            let pos = Pos::new(x as u16, y as u16);
            let (ch, mut style) = match grid.cell(pos) {
                Ok(cell) => cell_appearance(cell.owner, cell.troops, cell.attack_target.is_some()),
                Err(_) => (String::from(" "), Style::default()),
            };
            if app.sim.selected() == Some(pos) {
                style = style.bg(Color::DarkGray).add_modifier(Modifier::BOLD);
            }
            if app.cursor == pos {
                style = style.add_modifier(Modifier::REVERSED);
            }
            spans.push(Span::styled(format!("{ch} "), style));
        }
        lines.push(Line::from(spans));
    }

    let map_widget =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Map "));

    f.render_widget(map_widget, area);
}

fn cell_appearance(owner: Faction, troops: u32, attacking: bool) -> (String, Style) {
    let color = match owner {
        Faction::Red => Color::Red,
        Faction::Blue => Color::Blue,
        Faction::Unaligned => Color::DarkGray,
    };
    let ch = if troops > 0 {
        format!("{}", troops % 10)
    } else if owner.is_aligned() {
        String::from("o")
    } else {
        String::from(".")
    };
    let mut style = Style::default().fg(color);
    if attacking {
        style = style.add_modifier(Modifier::UNDERLINED);
    }
    (ch, style)
}

fn render_stats(f: &mut Frame, area: Rect, app: &App) {
    let grid = app.sim.world().grid();
    let mut lines = Vec::new();

    lines.push(Line::from(""));
    for faction in [Faction::Red, Faction::Blue] {
        let color = match faction {
            Faction::Red => Color::Red,
            Faction::Blue => Color::Blue,
            Faction::Unaligned => Color::DarkGray,
        };
        lines.push(Line::from(Span::styled(
            faction.to_string(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(format!(
            "  Cells: {}  Troops: {}",
            grid.claimed_by(faction),
            grid.troops_of(faction)
        )));
        lines.push(Line::from(""));
    }

    lines.push(Line::from(format!(
        "Active: {}  Attacks: {}",
        app.sim.world().active().count(),
        app.sim.pending_attack_count()
    )));
    if let Some(in_ticks) = app.sim.next_event_in() {
        lines.push(Line::from(format!("Next resolution in {in_ticks} ticks")));
    }
    lines.push(Line::from(""));

    lines.push(Line::from(format!("Cursor: {}", app.cursor)));
    if let Ok(cell) = app.sim.cell(app.cursor) {
        let occupation = match cell.occupation {
            Occupation::Unoccupied => "unoccupied",
            Occupation::Idle => "idle",
        };
        lines.push(Line::from(format!(
            "  {} | {} troops | {}",
            cell.owner, cell.troops, occupation
        )));
        if let Some(target) = cell.attack_target {
            lines.push(Line::from(format!("  attacking {target}")));
        }
    }
    if let Some(selected) = app.sim.selected() {
        lines.push(Line::from(format!("Selected: {selected}")));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        app.status.clone(),
        Style::default().fg(Color::Yellow),
    )));

    let stats_widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" State "))
        .wrap(Wrap { trim: false });

    f.render_widget(stats_widget, area);
}

fn render_footer(f: &mut Frame, area: Rect, _app: &App) {
    let controls =
        " [q] Quit  [Space] Pause  [n] Step  [Arrows] Cursor  [Enter] Select  [a] Attack  [s] Split  [Esc] Deselect  [+/-] Speed ";

    let footer = Paragraph::new(controls)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));

    f.render_widget(footer, area);
}
