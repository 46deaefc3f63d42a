use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame,
};

use crate::training::RunHistory;

/// Chart-ready series derived from a [`RunHistory`].
pub struct HistoryView {
    pub algorithm: String,
    pub rewards: Vec<(f64, f64)>,
    /// Trailing mean of the rewards over `window` episodes.
    pub mean_rewards: Vec<(f64, f64)>,
    pub losses: Vec<(f64, f64)>,
    pub window: usize,
    pub best_reward: f64,
    pub last_mean_reward: f64,
}

impl HistoryView {
    pub fn from_history(history: &RunHistory, window: usize) -> Self {
        let window = window.max(1);
        let rewards: Vec<(f64, f64)> = history
            .records
            .iter()
            .map(|r| (r.episode as f64, r.total_reward as f64))
            .collect();
        let losses = history
            .records
            .iter()
            .map(|r| (r.episode as f64, r.loss as f64))
            .collect();

        let mut mean_rewards = Vec::with_capacity(rewards.len());
        let mut sum = 0.0;
        for (i, &(x, y)) in rewards.iter().enumerate() {
            sum += y;
            if i >= window {
                sum -= rewards[i - window].1;
            }
            mean_rewards.push((x, sum / (i + 1).min(window) as f64));
        }

        HistoryView {
            algorithm: history.algorithm.clone(),
            best_reward: rewards.iter().map(|&(_, y)| y).fold(0.0, f64::max),
            last_mean_reward: mean_rewards.last().map_or(0.0, |&(_, y)| y),
            rewards,
            mean_rewards,
            losses,
            window,
        }
    }

    fn x_bounds(&self) -> [f64; 2] {
        match (self.rewards.first(), self.rewards.last()) {
            (Some(first), Some(last)) => [first.0, last.0.max(first.0 + 1.0)],
            _ => [0.0, 1.0],
        }
    }

    /// Loss axis range. Policy losses with a baseline go negative, so the
    /// lower bound follows the data below zero.
    fn loss_bounds(&self) -> [f64; 2] {
        [y_floor(&self.losses), y_ceiling(&self.losses, 0.1)]
    }
}

/// Upper axis bound: the largest value rounded up to a readable step.
fn y_ceiling(data: &[(f64, f64)], floor: f64) -> f64 {
    let max = data.iter().map(|&(_, y)| y).fold(floor, f64::max);
    let step = 10f64.powf(max.log10().floor()).max(1e-3);
    (max / step).ceil() * step
}

/// Lower axis bound: zero, or the smallest value rounded down when negative.
fn y_floor(data: &[(f64, f64)]) -> f64 {
    let min = data.iter().map(|&(_, y)| y).fold(0.0, f64::min);
    if min < 0.0 {
        -y_ceiling(&[(0.0, -min)], 0.0)
    } else {
        0.0
    }
}

/// Render the reward and loss charts for a finished run.
pub fn render(frame: &mut Frame, view: &HistoryView) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),      // Header
            Constraint::Percentage(55), // Reward chart
            Constraint::Min(8),         // Loss chart
            Constraint::Length(3),      // Footer
        ])
        .split(frame.area());

    render_header(frame, view, chunks[0]);
    render_reward_chart(frame, view, chunks[1]);
    render_loss_chart(frame, view, chunks[2]);
    render_footer(frame, chunks[3]);
}

fn render_header(frame: &mut Frame, view: &HistoryView, area: Rect) {
    let header_text = Line::from(vec![
        Span::styled(
            view.algorithm.clone(),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("  |  Episodes: {}", view.rewards.len())),
        Span::raw(format!("  |  Best: {:.0}", view.best_reward)),
        Span::raw(format!(
            "  |  Mean({}): {:.1}",
            view.window, view.last_mean_reward
        )),
    ]);

    let header = Paragraph::new(header_text)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));

    frame.render_widget(header, area);
}

fn render_reward_chart(frame: &mut Frame, view: &HistoryView, area: Rect) {
    let [x_min, x_max] = view.x_bounds();
    let y_max = y_ceiling(&view.rewards, 1.0);

    let mut datasets = vec![];
    if !view.rewards.is_empty() {
        datasets.push(
            Dataset::default()
                .name("Reward")
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(Color::DarkGray))
                .data(&view.rewards),
        );
        datasets.push(
            Dataset::default()
                .name(format!("Mean({})", view.window))
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(Color::Green))
                .data(&view.mean_rewards),
        );
    }

    let chart = Chart::new(datasets)
        .block(Block::default().borders(Borders::ALL).title("Reward"))
        .x_axis(
            Axis::default()
                .title("Episode")
                .labels(vec![
                    Span::raw(format!("{}", x_min as usize)),
                    Span::raw(format!("{}", x_max as usize)),
                ])
                .bounds([x_min, x_max]),
        )
        .y_axis(
            Axis::default()
                .title("Reward")
                .labels(vec![
                    Span::raw("0"),
                    Span::raw(format!("{:.0}", y_max / 2.0)),
                    Span::raw(format!("{:.0}", y_max)),
                ])
                .bounds([0.0, y_max]),
        );

    frame.render_widget(chart, area);
}

fn render_loss_chart(frame: &mut Frame, view: &HistoryView, area: Rect) {
    let [x_min, x_max] = view.x_bounds();
    let [y_min, y_max] = view.loss_bounds();

    let mut datasets = vec![];
    if !view.losses.is_empty() {
        datasets.push(
            Dataset::default()
                .name("Loss")
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(Color::Red))
                .data(&view.losses),
        );
    }

    let chart = Chart::new(datasets)
        .block(Block::default().borders(Borders::ALL).title("Loss"))
        .x_axis(
            Axis::default()
                .title("Episode")
                .labels(vec![
                    Span::raw(format!("{}", x_min as usize)),
                    Span::raw(format!("{}", x_max as usize)),
                ])
                .bounds([x_min, x_max]),
        )
        .y_axis(
            Axis::default()
                .title("Loss")
                .labels(vec![
                    Span::raw(format!("{:.2}", y_min)),
                    Span::raw(format!("{:.2}", y_max)),
                ])
                .bounds([y_min, y_max]),
        );

    frame.render_widget(chart, area);
}

fn render_footer(frame: &mut Frame, area: Rect) {
    let footer = Paragraph::new("Q: Quit")
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Controls"));

    frame.render_widget(footer, area);
}
