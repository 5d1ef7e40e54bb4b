use std::io;
use std::time::Duration;

use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use miette::IntoDiagnostic;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, LegendPosition, Paragraph};

use crate::chart::{ChartPlan, GRID_COLUMNS, Panel, grid_position, series_color};

const DATE_TICK_FORMAT: &str = "%d/%m";

/// Shows a [`ChartPlan`] in the alternate screen until a key is pressed.
pub struct TerminalChart<'a> {
    plan: &'a ChartPlan,
}

impl<'a> TerminalChart<'a> {
    pub fn new(plan: &'a ChartPlan) -> Self {
        Self { plan }
    }

    pub fn show(&self) -> miette::Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode().into_diagnostic()?;
        stdout.execute(EnterAlternateScreen).into_diagnostic()?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).into_diagnostic()?;
        terminal.clear().into_diagnostic()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode().into_diagnostic()?;
        let mut stdout = io::stdout();
        stdout.execute(LeaveAlternateScreen).into_diagnostic()?;
        result
    }

    fn event_loop(
        &self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> miette::Result<()> {
        loop {
            terminal
                .draw(|frame| draw_plan(frame, self.plan))
                .into_diagnostic()?;

            if event::poll(Duration::from_millis(250)).into_diagnostic()? {
                if let Event::Key(key) = event::read().into_diagnostic()? {
                    if key.kind == KeyEventKind::Press {
                        return Ok(());
                    }
                }
            }
        }
    }
}

pub fn draw_plan(frame: &mut ratatui::Frame, plan: &ChartPlan) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(frame.area());

    frame.render_widget(draw_header(plan), outer[0]);

    let rows = plan.grid_rows() as u32;
    let row_areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints((0..rows).map(|_| Constraint::Ratio(1, rows)).collect::<Vec<_>>())
        .split(outer[1]);

    let mut cells: Vec<Vec<Rect>> = Vec::with_capacity(row_areas.len());
    for row_area in row_areas.iter() {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(
                (0..GRID_COLUMNS)
                    .map(|_| Constraint::Ratio(1, GRID_COLUMNS as u32))
                    .collect::<Vec<_>>(),
            )
            .split(*row_area);
        cells.push(columns.to_vec());
    }

    for (index, panel) in plan.panels.iter().enumerate() {
        let (row, col) = grid_position(index);
        if let Some(area) = cells.get(row).and_then(|columns| columns.get(col)) {
            draw_panel(frame, *area, plan, panel);
        }
    }
}

fn draw_header(plan: &ChartPlan) -> Paragraph<'static> {
    let lines = vec![
        Line::from(Span::styled(
            plan.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            plan.subtitle.clone(),
            Style::default().fg(Color::Gray),
        )),
        Line::from(Span::styled(
            "press any key to close",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    Paragraph::new(lines).alignment(Alignment::Center)
}

fn draw_panel(frame: &mut ratatui::Frame, area: Rect, plan: &ChartPlan, panel: &Panel) {
    let points = panel
        .series
        .iter()
        .map(|series| {
            series
                .values
                .iter()
                .enumerate()
                .map(|(day, value)| (day as f64, *value as f64))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    let datasets = panel
        .series
        .iter()
        .zip(points.iter())
        .map(|(series, data)| {
            let [r, g, b] = series_color(series.color_index);
            Dataset::default()
                .name(series.label.clone())
                .marker(Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(Color::Rgb(r, g, b)))
                .data(data)
        })
        .collect::<Vec<_>>();

    let last_day = plan.dates.len().saturating_sub(1) as f64;
    let x_labels = [
        plan.dates.first(),
        plan.dates.get(plan.dates.len() / 2),
        plan.dates.last(),
    ]
    .into_iter()
    .map(|date| {
        date.map(|date| date.format(DATE_TICK_FORMAT).to_string())
            .unwrap_or_default()
    })
    .collect::<Vec<_>>();

    let y_max = (panel.max_value() as f64 * 1.05).max(1.0);
    let y_labels = [0.0, y_max / 2.0, y_max]
        .into_iter()
        .map(|value| format!("{value:.0}"))
        .collect::<Vec<_>>();

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .title(Span::styled(
                    panel.title.clone(),
                    Style::default().fg(Color::Cyan),
                ))
                .borders(Borders::ALL),
        )
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, last_day.max(1.0)])
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, y_max])
                .labels(y_labels),
        )
        .legend_position(Some(LegendPosition::TopLeft));
    frame.render_widget(chart, area);
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use ratatui::backend::TestBackend;

    use super::*;
    use crate::chart::Series;

    #[test]
    fn draws_panel_titles() {
        let series = Series {
            label: "Italy".to_string(),
            color_index: 0,
            values: vec![1, 4, 9],
        };
        let plan = ChartPlan {
            title: "Cases confirmed (World total: 9)".to_string(),
            subtitle: "Generated at: now UTC".to_string(),
            dates: (1..=3)
                .map(|day| NaiveDate::from_ymd_opt(2020, 3, day).unwrap())
                .collect(),
            panels: vec![
                Panel {
                    title: "Italy".to_string(),
                    series: vec![series.clone()],
                },
                Panel {
                    title: "All Countries".to_string(),
                    series: vec![series],
                },
            ],
        };

        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|frame| draw_plan(frame, &plan)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        let text = buffer
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect::<String>();
        assert!(text.contains("World total: 9"));
        assert!(text.contains("All Countries"));
    }
}
