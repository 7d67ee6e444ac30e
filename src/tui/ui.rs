//! UI rendering for the debugger.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, List, ListItem, Wrap},
    style::{Color, Style, Modifier},
};
use super::app::{DebuggerApp, MEM_ROW};

/// Main draw function.
pub fn draw(frame: &mut Frame, app: &DebuggerApp) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(45),
            Constraint::Percentage(55),
        ])
        .split(frame.area());

    // Left side: code and status
    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),
            Constraint::Length(7),
            Constraint::Length(3),
        ])
        .split(chunks[0]);

    draw_disassembly(frame, left_chunks[0], app);
    draw_registers(frame, left_chunks[1], app);
    draw_status(frame, left_chunks[2], app);

    // Right side: memory, console and help
    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),
            Constraint::Length(8),
            Constraint::Length(4),
        ])
        .split(chunks[1]);

    draw_memory(frame, right_chunks[0], app);
    draw_console(frame, right_chunks[1], app);
    draw_help(frame, right_chunks[2]);
}

fn draw_disassembly(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let disasm = app.get_disassembly((area.height as usize).saturating_sub(2));

    let items: Vec<ListItem> = disasm
        .iter()
        .map(|(addr, instr, is_current)| {
            let prefix = if *is_current { "▶ " } else { "  " };
            let bp = if app.breakpoints.contains(addr) { "●" } else { " " };
            let text = format!("{}{:04X}: {}", prefix, addr, instr);

            let style = if *is_current {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if app.breakpoints.contains(addr) {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };

            ListItem::new(format!("{} {}", bp, text)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" Disassembly ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)));

    frame.render_widget(list, area);
}

fn draw_registers(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let regs = &app.cpu.regs;
    let value = Style::default().fg(Color::White);

    let content = vec![
        Line::from(vec![
            Span::raw("A: "),
            Span::styled(format!("{:02X}", regs.a), value),
            Span::raw("  BC: "),
            Span::styled(format!("{:04X}", regs.bc()), value),
            Span::raw("  DE: "),
            Span::styled(format!("{:04X}", regs.de()), value),
            Span::raw("  HL: "),
            Span::styled(format!("{:04X}", regs.hl()), value),
        ]),
        Line::from(vec![
            Span::raw("PC: "),
            Span::styled(format!("{:04X}", regs.pc), Style::default().fg(Color::Yellow)),
            Span::raw("  SP: "),
            Span::styled(format!("{:04X}", regs.sp), value),
            Span::raw("  Flags: "),
            flag_span("S", regs.flags.sign),
            flag_span("Z", regs.flags.zero),
            flag_span("A", regs.flags.aux_carry),
            flag_span("P", regs.flags.parity),
            flag_span("C", regs.flags.carry),
        ]),
        Line::from(vec![
            Span::raw("Steps: "),
            Span::styled(format!("{}", app.cpu.steps), Style::default().fg(Color::Cyan)),
            Span::raw("   State: "),
            Span::styled(format!("{:?}", app.cpu.state),
                if app.cpu.is_running() {
                    Style::default().fg(Color::Green)
                } else {
                    Style::default().fg(Color::Red)
                }),
            Span::raw(if app.cpu.interrupts_enabled { "   EI" } else { "   DI" }),
        ]),
    ];

    let paragraph = Paragraph::new(content)
        .block(Block::default()
            .title(" Registers ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)));

    frame.render_widget(paragraph, area);
}

/// Hex dump, one row of `MEM_ROW` bytes per line.
fn draw_memory(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let visible_rows = (area.height as usize).saturating_sub(2);
    let start = app.mem_scroll;
    let end = (start + visible_rows).min(crate::cpu::MEMORY_SIZE / MEM_ROW);
    let pc = app.cpu.regs.pc as usize;
    let sp = app.cpu.regs.sp as usize;

    let items: Vec<ListItem> = (start..end)
        .map(|row| {
            let base = row * MEM_ROW;
            let bytes = app.cpu.mem.dump(base as u16, MEM_ROW);

            let mut spans = vec![Span::styled(
                format!("{:04X}: ", base),
                Style::default().fg(Color::DarkGray),
            )];
            for (i, byte) in bytes.iter().enumerate() {
                let style = if base + i == pc {
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
                } else if base + i == sp {
                    Style::default().fg(Color::Magenta)
                } else if *byte != 0 {
                    Style::default().fg(Color::White)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                spans.push(Span::styled(format!("{:02X} ", byte), style));
            }

            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" Memory ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)));

    frame.render_widget(list, area);
}

fn draw_console(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let rows = (area.height as usize).saturating_sub(2);
    let lines: Vec<&str> = app.console.lines().collect();
    let tail = lines[lines.len().saturating_sub(rows)..].join("\n");

    let console = Paragraph::new(tail)
        .wrap(Wrap { trim: false })
        .block(Block::default()
            .title(" Console ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue)));

    frame.render_widget(console, area);
}

fn draw_status(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let status = Paragraph::new(app.status.clone())
        .style(Style::default().fg(Color::White))
        .block(Block::default()
            .title(" Status ")
            .borders(Borders::ALL));

    frame.render_widget(status, area);
}

fn draw_help(frame: &mut Frame, area: Rect) {
    let help = Paragraph::new(vec![
        Line::from("s: Step  r: Run  p: Pause  b: Breakpoint  x: Reset"),
        Line::from("↑↓ PgUp PgDn: Scroll memory  q: Quit"),
    ])
    .style(Style::default().fg(Color::DarkGray))
    .block(Block::default()
        .title(" Help ")
        .borders(Borders::ALL));

    frame.render_widget(help, area);
}

/// Flag letter, lit when set.
fn flag_span(name: &'static str, set: bool) -> Span<'static> {
    if set {
        Span::styled(name, Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
    } else {
        Span::styled(name, Style::default().fg(Color::DarkGray))
    }
}
