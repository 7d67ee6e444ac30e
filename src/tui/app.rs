//! Debugger application state and logic.

use crate::asm::disasm::decode_at;
use crate::config::RunConfig;
use crate::cpu::{Cpu, MemoryError};
use std::collections::{HashSet, VecDeque};

/// Instructions executed per UI tick while running.
const STEPS_PER_TICK: usize = 500;
/// Executed addresses kept for the disassembly view.
const HISTORY_LEN: usize = 8;
/// Bytes per row in the memory view.
pub const MEM_ROW: usize = 16;

/// Debugger application state.
pub struct DebuggerApp {
    /// The CPU being debugged.
    pub cpu: Cpu,
    config: RunConfig,
    image: Vec<u8>,
    /// Breakpoints (by address).
    pub breakpoints: HashSet<u16>,
    /// Is the debugger running continuously?
    pub running: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// First memory row shown.
    pub mem_scroll: usize,
    /// Everything the program printed so far.
    pub console: String,
    history: VecDeque<u16>,
}

impl DebuggerApp {
    /// Create a new debugger with a loaded image.
    pub fn new(config: RunConfig, image: Vec<u8>) -> Result<Self, MemoryError> {
        let cpu = config.build_cpu(&image)?;
        let mem_scroll = config.load_address as usize / MEM_ROW;

        Ok(Self {
            cpu,
            config,
            image,
            breakpoints: HashSet::new(),
            running: false,
            should_quit: false,
            status: "Ready. Press 's' to step, 'r' to run, 'q' to quit.".into(),
            mem_scroll,
            console: String::new(),
            history: VecDeque::with_capacity(HISTORY_LEN),
        })
    }

    /// Step one instruction.
    pub fn step(&mut self) {
        if !self.cpu.is_running() {
            self.status = format!("CPU stopped: {:?}", self.cpu.state);
            self.running = false;
            return;
        }

        let pc = self.cpu.regs.pc;
        let (_, text) = decode_at(&self.cpu.mem, pc);
        match self.cpu.step() {
            Ok(_) => {
                self.status = format!("PC={:04X}: {}", pc, text);
                if self.history.len() == HISTORY_LEN {
                    self.history.pop_front();
                }
                self.history.push_back(pc);
            }
            Err(e) => {
                self.status = format!("Error: {}", e);
                self.running = false;
            }
        }
        self.drain_console();
    }

    /// Run until halt, breakpoint, or error.
    pub fn run(&mut self) {
        self.running = true;
        self.status = "Running...".into();
    }

    /// Run one batch of continuous execution.
    pub fn tick(&mut self) {
        for _ in 0..STEPS_PER_TICK {
            if !self.running {
                return;
            }

            if !self.cpu.is_running() {
                self.running = false;
                self.status = format!("{:?} after {} steps", self.cpu.state, self.cpu.steps);
                return;
            }

            if (self.cpu.regs.pc as u32) >= self.cpu.program_end() {
                self.running = false;
                self.status = format!("PC={:04X} left the program", self.cpu.regs.pc);
                return;
            }

            if let Some(max) = self.config.max_steps {
                if self.cpu.steps >= max {
                    self.running = false;
                    self.status = format!("Step limit {} reached", max);
                    return;
                }
            }

            self.step();

            let pc = self.cpu.regs.pc;
            if self.running && self.breakpoints.contains(&pc) {
                self.running = false;
                self.status = format!("Breakpoint at PC={:04X}", pc);
            }
        }
    }

    /// Toggle breakpoint at current PC.
    pub fn toggle_breakpoint(&mut self) {
        let pc = self.cpu.regs.pc;
        if self.breakpoints.remove(&pc) {
            self.status = format!("Removed breakpoint at PC={:04X}", pc);
        } else {
            self.breakpoints.insert(pc);
            self.status = format!("Set breakpoint at PC={:04X}", pc);
        }
    }

    /// Reload the image and start over.
    pub fn reset(&mut self) {
        match self.config.build_cpu(&self.image) {
            Ok(cpu) => {
                self.cpu = cpu;
                self.status = "Reset. Ready.".into();
            }
            Err(e) => self.status = format!("Reset failed: {}", e),
        }
        self.console.clear();
        self.history.clear();
        self.running = false;
    }

    pub fn scroll_up(&mut self) {
        self.mem_scroll = self.mem_scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        if self.mem_scroll + 1 < crate::cpu::MEMORY_SIZE / MEM_ROW {
            self.mem_scroll += 1;
        }
    }

    /// Recently executed instructions followed by the ones from PC onward.
    /// Each entry is (address, text, is_current).
    pub fn get_disassembly(&self, lines: usize) -> Vec<(u16, String, bool)> {
        let pc = self.cpu.regs.pc;
        let behind = self.history.len().min(lines / 3);

        let mut out: Vec<(u16, String, bool)> = self.history
            .iter()
            .skip(self.history.len() - behind)
            .filter(|&&addr| addr != pc)
            .map(|&addr| (addr, decode_at(&self.cpu.mem, addr).1, false))
            .collect();

        let mut addr = pc;
        while out.len() < lines {
            let (instr, text) = decode_at(&self.cpu.mem, addr);
            out.push((addr, text, addr == pc));
            addr = addr.wrapping_add(instr.size() as u16);
        }

        out
    }

    fn drain_console(&mut self) {
        let bytes = self.cpu.take_console();
        if !bytes.is_empty() {
            self.console.push_str(&String::from_utf8_lossy(&bytes));
        }
    }
}

/// Run the debugger on an image.
pub fn run_debugger(config: RunConfig, image: Vec<u8>) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::Duration;

    let mut app = DebuggerApp::new(config, image)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    loop {
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') => app.should_quit = true,
                        KeyCode::Char('s') => {
                            app.running = false;
                            app.step();
                        }
                        KeyCode::Char('r') => app.run(),
                        KeyCode::Char('p') => {
                            app.running = false;
                            app.status = "Paused.".into();
                        }
                        KeyCode::Char('b') => app.toggle_breakpoint(),
                        KeyCode::Char('x') => app.reset(),
                        KeyCode::Up => app.scroll_up(),
                        KeyCode::Down => app.scroll_down(),
                        KeyCode::PageUp => app.mem_scroll = app.mem_scroll.saturating_sub(16),
                        KeyCode::PageDown => {
                            for _ in 0..16 {
                                app.scroll_down();
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        if app.running {
            app.tick();
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // MVI C,9; LXI D,msg; CALL 5; JMP 0; msg: "ok$"
    const HELLO: [u8; 14] = [
        0x0E, 0x09, 0x11, 0x0B, 0x01, 0xCD, 0x05, 0x00, 0xC3, 0x00, 0x00, b'o', b'k', b'$',
    ];

    fn app() -> DebuggerApp {
        DebuggerApp::new(RunConfig::cpm(), HELLO.to_vec()).unwrap()
    }

    #[test]
    fn test_step_updates_status() {
        let mut app = app();
        app.step();

        assert_eq!(app.cpu.regs.pc, 0x0102);
        assert_eq!(app.status, "PC=0100: MVI C,$09");
    }

    #[test]
    fn test_run_collects_console() {
        let mut app = app();
        app.run();
        app.tick();

        assert!(!app.running);
        assert_eq!(app.console, "ok");
        assert!(app.status.starts_with("Stopped"));
    }

    #[test]
    fn test_breakpoint_pauses() {
        let mut app = app();
        app.breakpoints.insert(0x0105);
        app.run();
        app.tick();

        assert!(!app.running);
        assert_eq!(app.cpu.regs.pc, 0x0105);
        assert_eq!(app.status, "Breakpoint at PC=0105");
    }

    #[test]
    fn test_reset_reloads() {
        let mut app = app();
        app.run();
        app.tick();
        app.reset();

        assert!(app.cpu.is_running());
        assert_eq!(app.cpu.regs.pc, 0x0100);
        assert!(app.console.is_empty());
    }

    #[test]
    fn test_disassembly_marks_pc() {
        let mut app = app();
        app.step();

        let lines = app.get_disassembly(6);
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], (0x0100, "MVI C,$09".to_string(), false));
        assert_eq!(lines[1], (0x0102, "LXI D,$010B".to_string(), true));
        assert_eq!(lines[2].0, 0x0105);
    }
}
