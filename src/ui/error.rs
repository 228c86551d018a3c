//! Full-screen error display for the capture workflow.
//!
//! Shows a human-readable error message on a red screen and waits for a
//! key press, so failures surface even while the terminal is in the
//! alternate screen.

use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Paragraph, Wrap},
};
use std::io::{self, Stdout};

/// Error screen for displaying human-readable error messages.
pub struct ErrorScreen {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl ErrorScreen {
    /// Creates a new error screen and enters alternate screen mode.
    ///
    /// # Errors
    /// - If terminal cannot be initialized
    /// - If raw mode cannot be enabled
    /// - If alternate screen cannot be entered
    pub fn new() -> anyhow::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(ErrorScreen { terminal })
    }

    /// Displays an error message centered on a red screen.
    ///
    /// Waits for any key press to dismiss. Message wraps to 80% of screen
    /// width.
    ///
    /// # Errors
    /// - If terminal rendering fails
    pub fn show_error(&mut self, error_message: &str) -> anyhow::Result<()> {
        loop {
            self.terminal.draw(|frame| {
                let area = frame.area();
                let backdrop = Style::default().bg(Color::Rgb(200, 30, 30));

                frame.render_widget(Block::default().style(backdrop), area);

                let text_area = Rect {
                    x: area.x + area.width / 10,
                    y: area.y + area.height / 3,
                    width: (area.width * 80) / 100,
                    height: area.height - area.height / 3,
                };

                let paragraph = Paragraph::new(error_message)
                    .style(backdrop.fg(Color::Rgb(255, 255, 255)))
                    .alignment(Alignment::Center)
                    .wrap(Wrap { trim: true });

                frame.render_widget(paragraph, text_area);
            })?;

            if event::poll(std::time::Duration::from_millis(100))? {
                if let Event::Key(_) = event::read()? {
                    break;
                }
            }
        }

        Ok(())
    }

    /// Cleans up terminal state and exits alternate screen mode.
    ///
    /// # Errors
    /// - If terminal mode cannot be disabled
    /// - If cursor cannot be shown
    pub fn cleanup(&mut self) -> anyhow::Result<()> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for ErrorScreen {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}
