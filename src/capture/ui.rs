//! Terminal user interface for audio capture with bar visualization.
//!
//! Provides the real-time frequency-bar display, recording duration
//! footer, and user input handling for the capture workflow.

use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    style::{Color, Style},
};
use std::error::Error;
use std::io::{stdout, Stdout};

use super::recorder::Recorder;
use super::visualizer::BarVisualizer;

/// Duration after which the footer shows a wrap-up hint. Display-only;
/// the recorder never stops a session on its own.
const SOFT_LIMIT_SECS: u64 = 300;

/// User input command during capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureCommand {
    /// Continue recording (no key pressed)
    Continue,
    /// Finish the recording and deliver it (Enter key)
    Finish,
    /// Discard the recording (Escape or 'q')
    Cancel,
}

/// Terminal UI for audio capture with frequency-bar visualization.
pub struct CaptureTui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    visualizer: BarVisualizer,
}

impl CaptureTui {
    /// Creates a new TUI instance and enters alternate screen mode.
    ///
    /// # Errors
    /// - If terminal cannot be initialized
    /// - If raw mode cannot be enabled
    /// - If alternate screen cannot be entered
    pub fn new(accent: Color) -> Result<Self, Box<dyn Error>> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, crossterm::terminal::EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(CaptureTui {
            terminal,
            visualizer: BarVisualizer::new(accent),
        })
    }

    /// Renders one frame: the bar chart plus the duration footer.
    ///
    /// # Errors
    /// - If terminal rendering fails
    pub fn render(&mut self, recorder: &Recorder) -> Result<(), Box<dyn Error>> {
        // Read the observables before the draw closure to avoid borrow issues
        let active = recorder.is_active();
        let elapsed = recorder.elapsed_seconds();
        let handle = recorder.analysis_handle();
        let visualizer = &self.visualizer;

        self.terminal.draw(|frame| {
            let area = frame.area();

            let footer_height = 1;

            let chart_area = Rect {
                x: area.x,
                y: area.y,
                width: area.width,
                height: area.height.saturating_sub(footer_height),
            };

            visualizer.render(frame, chart_area, handle.as_deref(), active);

            let footer_area = Rect {
                x: area.x,
                y: area.y + area.height.saturating_sub(footer_height),
                width: area.width,
                height: footer_height,
            };

            let minutes = elapsed / 60;
            let secs = elapsed % 60;

            let indicator = if active {
                ratatui::text::Span::styled("● ", Style::default().fg(Color::Red))
            } else {
                ratatui::text::Span::raw("  ")
            };

            let mut spans = vec![
                indicator,
                ratatui::text::Span::raw(format!("{minutes}:{secs:02}")),
                ratatui::text::Span::raw("  Enter: deliver · Esc/q: discard"),
            ];

            if elapsed >= SOFT_LIMIT_SECS {
                spans.push(ratatui::text::Span::styled(
                    "  ⚠ over 5 minutes",
                    Style::default().fg(Color::Yellow),
                ));
            }

            let footer = ratatui::widgets::Paragraph::new(ratatui::text::Line::from(spans))
                .style(
                    Style::default()
                        .fg(Color::Rgb(185, 207, 212))
                        .bg(Color::Rgb(0, 0, 0)),
                );

            frame.render_widget(footer, footer_area);
        })?;

        Ok(())
    }

    /// Processes user input and returns the appropriate capture command.
    ///
    /// Only responds to Enter (finish), Escape, 'q', and Ctrl+C (cancel).
    /// All other keys are ignored.
    ///
    /// # Errors
    /// - If event polling fails
    pub fn handle_input(&mut self) -> Result<CaptureCommand, Box<dyn Error>> {
        if event::poll(std::time::Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                return Ok(match key.code {
                    KeyCode::Enter => {
                        tracing::debug!("Enter pressed: finishing recording");
                        CaptureCommand::Finish
                    }
                    KeyCode::Char('q') | KeyCode::Esc => {
                        tracing::debug!("Escape or 'q' pressed: discarding recording");
                        CaptureCommand::Cancel
                    }
                    KeyCode::Char('c')
                        if key
                            .modifiers
                            .contains(crossterm::event::KeyModifiers::CONTROL) =>
                    {
                        tracing::debug!("Ctrl+C pressed: discarding recording");
                        CaptureCommand::Cancel
                    }
                    _ => CaptureCommand::Continue,
                });
            }
        }
        Ok(CaptureCommand::Continue)
    }

    /// Cleans up terminal state and exits alternate screen mode.
    ///
    /// # Errors
    /// - If terminal mode cannot be disabled
    /// - If cursor cannot be shown
    pub fn cleanup(&mut self) -> Result<(), Box<dyn Error>> {
        disable_raw_mode()?;
        execute!(
            self.terminal.backend_mut(),
            crossterm::terminal::LeaveAlternateScreen
        )?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}
