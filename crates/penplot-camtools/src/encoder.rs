//! Command Encoder
//!
//! Flattens ordered millimeter polylines into pen-up/pen-down motion
//! commands and renders them in the controller's line format.

use penplot_core::artifact;
use penplot_core::{Command, MmPoint, MmPolyline, ParameterError, PenFlags};
use std::path::Path;

/// Builds command sequences for the plotter controller
#[derive(Debug, Clone, Copy)]
pub struct CommandEncoder {
    flags: PenFlags,
    home: MmPoint,
}

impl Default for CommandEncoder {
    fn default() -> Self {
        Self {
            flags: PenFlags::default(),
            home: MmPoint::new(0.0, 0.0),
        }
    }
}

impl CommandEncoder {
    /// Create an encoder. `home` is the neutral position of the opening
    /// pen-up command. Fails when both pen states share a flag value.
    pub fn new(flags: PenFlags, home: MmPoint) -> Result<Self, ParameterError> {
        if flags.up == flags.down {
            return Err(ParameterError::InvalidValue {
                name: "pen_flags".to_string(),
                reason: format!("pen-up and pen-down both use {}", flags.up),
            });
        }
        Ok(Self { flags, home })
    }

    /// Flag values written in the `z:` field
    pub fn flags(&self) -> PenFlags {
        self.flags
    }

    /// Encode polylines in the given order.
    ///
    /// The sequence opens with a pen-up at home. Each polyline then gets a
    /// pen-up move to its first point, a pen-down command at every point
    /// (the first included) and a pen-up at its last point. Empty
    /// polylines produce nothing.
    pub fn encode(&self, polylines: &[MmPolyline]) -> Vec<Command> {
        let drawn: usize = polylines.iter().map(|p| p.len() + 2).sum();
        let mut commands = Vec::with_capacity(1 + drawn);
        commands.push(Command::up(self.home.x, self.home.y));

        for polyline in polylines {
            let (Some(first), Some(last)) = (polyline.start(), polyline.end()) else {
                continue;
            };
            commands.push(Command::up(first.x, first.y));
            commands.extend(polyline.points().iter().map(|p| Command::down(p.x, p.y)));
            commands.push(Command::up(last.x, last.y));
        }

        commands
    }

    /// Render one command as a controller line, newline included
    pub fn format_line(&self, command: &Command) -> String {
        command.to_line(self.flags)
    }

    /// Render every command
    pub fn format_lines(&self, commands: &[Command]) -> Vec<String> {
        commands.iter().map(|c| self.format_line(c)).collect()
    }

    /// Write the command file in one atomic step
    pub fn write_command_file(&self, path: &Path, commands: &[Command]) -> penplot_core::Result<()> {
        artifact::write_lines(path, &self.format_lines(commands))?;
        tracing::info!("Wrote {} commands to {}", commands.len(), path.display());
        Ok(())
    }

    /// Read and validate a command file written by [`Self::write_command_file`]
    pub fn read_command_file(&self, path: &Path) -> penplot_core::Result<Vec<Command>> {
        self.parse_lines(&artifact::read_lines(path)?)
    }

    /// Validate command lines already read from a file
    pub fn parse_lines(&self, lines: &[String]) -> penplot_core::Result<Vec<Command>> {
        lines
            .iter()
            .map(|line| Command::parse_line(line, self.flags).map_err(Into::into))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use penplot_core::PenState;

    #[test]
    fn test_empty_input_is_single_pen_up() {
        let commands = CommandEncoder::default().encode(&[]);
        assert_eq!(commands, vec![Command::up(0.0, 0.0)]);
    }

    #[test]
    fn test_encode_two_polylines() {
        let a = MmPolyline::from_coords(&[(1.0, 1.0), (2.0, 1.0)]);
        let b = MmPolyline::from_coords(&[(5.0, 5.0), (5.0, 6.0), (6.0, 6.0)]);
        let commands = CommandEncoder::default().encode(&[a, b]);

        assert_eq!(
            commands,
            vec![
                Command::up(0.0, 0.0),
                Command::up(1.0, 1.0),
                Command::down(1.0, 1.0),
                Command::down(2.0, 1.0),
                Command::up(2.0, 1.0),
                Command::up(5.0, 5.0),
                Command::down(5.0, 5.0),
                Command::down(5.0, 6.0),
                Command::down(6.0, 6.0),
                Command::up(6.0, 6.0),
            ]
        );
        assert_eq!(commands.first().map(|c| c.pen), Some(PenState::Up));
        assert_eq!(commands.last().map(|c| c.pen), Some(PenState::Up));
    }

    #[test]
    fn test_home_position() {
        let encoder =
            CommandEncoder::new(PenFlags::default(), MmPoint::new(10.0, 20.0)).unwrap();
        assert_eq!(encoder.encode(&[])[0], Command::up(10.0, 20.0));
    }

    #[test]
    fn test_rejects_identical_flags() {
        let flags = PenFlags { up: 1, down: 1 };
        assert!(CommandEncoder::new(flags, MmPoint::default()).is_err());
    }

    #[test]
    fn test_format_lines() {
        let encoder = CommandEncoder::default();
        let lines = encoder.format_lines(&[Command::up(0.0, 0.0), Command::down(12.5, 3.5)]);
        assert_eq!(lines, vec!["x:000.0y:000.0z:1\n", "x:012.5y:003.5z:0\n"]);
    }
}
