//! The command table and its dispatcher.
//!
//! Commands are keyword sequences followed by arguments. Every keyword may be
//! abbreviated to any prefix that is unique among the commands of the
//! current mode (`conf t`, `sh ip int br`). An exact keyword always wins over
//! a longer one it happens to prefix.

use std::net::Ipv4Addr;

use netlab_topology::{AdminState, Device, Interface, InterfaceId, Ipv4Cidr};
use tracing::debug;

use crate::context::{CliContext, DevicePatch, InterfacePatch};
use crate::error::{Error, Result};
use crate::mode::CliMode;
use crate::state::{build_prompt, CliState};

use CliMode::{GlobalConfig, InterfaceConfig, Privileged, User};

/// What a command does once matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Enable,
    Disable,
    ConfigureTerminal,
    Exit,
    End,
    Help,
    ShowVersion,
    ShowHistory,
    ShowRunningConfig,
    ShowInterfaces,
    ShowIpInterfaceBrief,
    Hostname,
    Interface,
    IpAddress,
    NoIpAddress,
    Shutdown,
    NoShutdown,
    Description,
}

/// Arguments a command takes after its keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Args {
    None,
    /// Exactly this many, described by the usage text
    Exact(usize, &'static str),
    /// One or more words, joined with single spaces
    Rest(&'static str),
}

/// One row of the command table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub keywords: &'static [&'static str],
    pub modes: &'static [CliMode],
    pub args: Args,
    pub help: &'static str,
    pub action: Action,
}

impl CommandSpec {
    pub fn available_in(&self, mode: CliMode) -> bool {
        self.modes.contains(&mode)
    }

    /// Keywords and argument placeholders, for help output.
    pub fn syntax(&self) -> String {
        let keywords = self.keywords.join(" ");
        match self.args {
            Args::None => keywords,
            Args::Exact(_, usage) | Args::Rest(usage) => format!("{keywords} {usage}"),
        }
    }
}

const EXEC: &[CliMode] = &[User, Privileged];
const ANY_CONFIG: &[CliMode] = &[GlobalConfig, InterfaceConfig];
const EVERYWHERE: &[CliMode] = &[User, Privileged, GlobalConfig, InterfaceConfig];

macro_rules! command {
    ([$($kw:literal),+], $modes:expr, $args:expr, $action:ident, $help:literal) => {
        CommandSpec {
            keywords: &[$($kw),+],
            modes: $modes,
            args: $args,
            help: $help,
            action: Action::$action,
        }
    };
}

/// Every command, in the order help lists them.
pub const COMMANDS: &[CommandSpec] = &[
    command!(["enable"], &[User], Args::None, Enable, "Turn on privileged commands"),
    command!(["disable"], &[Privileged], Args::None, Disable, "Turn off privileged commands"),
    command!(["configure", "terminal"], &[Privileged], Args::None, ConfigureTerminal, "Enter configuration mode"),
    command!(["show", "version"], EXEC, Args::None, ShowVersion, "Hardware and firmware information"),
    command!(["show", "history"], EXEC, Args::None, ShowHistory, "Commands entered in this session"),
    command!(["show", "running-config"], &[Privileged], Args::None, ShowRunningConfig, "Current configuration"),
    command!(["show", "interfaces"], &[Privileged], Args::None, ShowInterfaces, "Interface status and addressing"),
    command!(["show", "ip", "interface", "brief"], &[Privileged], Args::None, ShowIpInterfaceBrief, "One-line summary per interface"),
    command!(["hostname"], &[GlobalConfig], Args::Exact(1, "<name>"), Hostname, "Set the system name"),
    command!(["interface"], &[GlobalConfig], Args::Exact(1, "<id>"), Interface, "Select an interface to configure"),
    command!(["ip", "address"], &[InterfaceConfig], Args::Exact(2, "<address> <mask | /len>"), IpAddress, "Set the interface address"),
    command!(["no", "ip", "address"], &[InterfaceConfig], Args::None, NoIpAddress, "Remove the interface address"),
    command!(["shutdown"], &[InterfaceConfig], Args::None, Shutdown, "Administratively disable the interface"),
    command!(["no", "shutdown"], &[InterfaceConfig], Args::None, NoShutdown, "Enable the interface"),
    command!(["description"], &[InterfaceConfig], Args::Rest("<text>"), Description, "Interface description"),
    command!(["end"], ANY_CONFIG, Args::None, End, "Return to privileged mode"),
    command!(["exit"], EVERYWHERE, Args::None, Exit, "Leave the current mode"),
    command!(["help"], EVERYWHERE, Args::None, Help, "List available commands"),
    command!(["?"], EVERYWHERE, Args::None, Help, "List available commands"),
];

/// Commands available in a mode, in table order.
pub fn commands_for(mode: CliMode) -> impl Iterator<Item = &'static CommandSpec> {
    COMMANDS.iter().filter(move |c| c.available_in(mode))
}

/// A matched command and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed<'a> {
    pub command: &'static CommandSpec,
    pub args: Vec<&'a str>,
}

/// Resolve the keyword prefix of `tokens` among `candidates`.
///
/// On success returns the command and the index of the first argument.
pub(crate) fn match_keywords(
    tokens: &[&str],
    mut candidates: Vec<&'static CommandSpec>,
) -> Result<(&'static CommandSpec, usize)> {
    let mut depth = 0;
    loop {
        if let Some(done) = candidates.iter().copied().find(|c| c.keywords.len() == depth) {
            return Ok((done, depth));
        }
        let Some(token) = tokens.get(depth) else {
            return Err(Error::Incomplete(tokens.join(" ")));
        };
        let token = token.to_ascii_lowercase();

        let mut next: Vec<_> = candidates
            .into_iter()
            .filter(|c| c.keywords[depth].starts_with(token.as_str()))
            .collect();
        if next.is_empty() {
            return Err(Error::UnknownCommand(tokens[..=depth].join(" ")));
        }
        if next.iter().any(|c| c.keywords[depth] == token) {
            next.retain(|c| c.keywords[depth] == token);
        }
        let first = next[0].keywords[depth];
        if next.iter().any(|c| c.keywords[depth] != first) {
            return Err(Error::Ambiguous(tokens[..=depth].join(" ")));
        }

        candidates = next;
        depth += 1;
    }
}

/// Match an input line against the commands of `mode`.
pub fn parse(line: &str, mode: CliMode) -> Result<Parsed<'_>> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let in_mode = commands_for(mode).collect();

    let (command, first_arg) = match match_keywords(&tokens, in_mode) {
        Ok(found) => found,
        Err(Error::UnknownCommand(text)) => {
            // Known elsewhere? Then say so instead of "unknown".
            let everywhere = COMMANDS.iter().collect();
            return Err(match match_keywords(&tokens, everywhere) {
                Ok((other, _)) => Error::WrongMode {
                    command: other.keywords.join(" "),
                    mode,
                },
                Err(_) => Error::UnknownCommand(text),
            });
        }
        Err(other) => return Err(other),
    };

    let args = tokens[first_arg..].to_vec();
    match command.args {
        Args::None => {
            if let Some(extra) = args.first() {
                return Err(Error::UnexpectedArgument(extra.to_string()));
            }
        }
        Args::Exact(count, _) => {
            if args.len() < count {
                return Err(Error::Incomplete(line.trim().to_string()));
            }
            if let Some(extra) = args.get(count) {
                return Err(Error::UnexpectedArgument(extra.to_string()));
            }
        }
        Args::Rest(_) => {
            if args.is_empty() {
                return Err(Error::Incomplete(line.trim().to_string()));
            }
        }
    }

    Ok(Parsed { command, args })
}

/// Run one line of input and return the next state.
///
/// Echoes `prompt + input` to the transcript, then the command's output or a
/// single `% error` line, then records the input in history. Echo and
/// history keep the line as typed, minus its line terminator. Blank input
/// leaves the state untouched. Never fails: errors only ever become output.
pub fn process_command(input: &str, mut state: CliState, context: &mut CliContext<'_>) -> CliState {
    let raw = input.trim_end_matches(['\r', '\n']);
    if raw.trim().is_empty() {
        return state;
    }

    state.output.push(format!("{}{}", build_prompt(&state), raw));
    match parse(raw, state.mode).and_then(|parsed| execute(&parsed, &mut state, context)) {
        Ok(lines) => state.output.extend(lines),
        Err(err) => {
            debug!(device = %context.device.id, input = raw, %err, "command rejected");
            state.output.push(format!("% {err}"));
        }
    }
    state.history.push(raw.to_string());
    state
}

/// Apply a parsed command. State and store are only touched once the
/// command is known to succeed.
fn execute(parsed: &Parsed<'_>, state: &mut CliState, ctx: &mut CliContext<'_>) -> Result<Vec<String>> {
    let device = ctx.device;
    let mut out = Vec::new();

    match parsed.command.action {
        Action::Enable => state.enter(Privileged),
        Action::Disable => state.enter(User),
        Action::ConfigureTerminal => {
            out.push("Enter configuration commands, one per line. End with \"end\".".to_string());
            state.enter(GlobalConfig);
        }
        Action::Exit => match state.mode.parent() {
            Some(parent) => state.enter(parent),
            None => out.push("Already at the top level.".to_string()),
        },
        Action::End => state.enter(Privileged),
        Action::Help => {
            out.push(format!("Commands available in {} mode:", state.mode));
            let width = commands_for(state.mode)
                .map(|c| c.syntax().len())
                .max()
                .unwrap_or(0);
            for command in commands_for(state.mode) {
                out.push(format!("  {:<width$}  {}", command.syntax(), command.help));
            }
        }
        Action::ShowVersion => {
            let hardware = device.hardware();
            out.push(format!("{} software, version {}", hardware.name, hardware.firmware));
            out.push(format!("{} ({}) uptime is 0 minutes", state.hostname, device.kind.label()));
            out.push(format!("{} interfaces", device.interfaces.len()));
        }
        Action::ShowHistory => {
            out.extend(state.history.iter().map(|line| format!("  {line}")));
        }
        Action::ShowRunningConfig => out.extend(running_config(&state.hostname, device)),
        Action::ShowInterfaces => {
            for iface in &device.interfaces {
                out.extend(interface_detail(device, iface));
            }
        }
        Action::ShowIpInterfaceBrief => {
            out.push(format!(
                "{:<16}{:<16}{:<5}{:<22}{}",
                "Interface", "IP-Address", "OK?", "Status", "Protocol"
            ));
            for iface in &device.interfaces {
                out.push(format!(
                    "{:<16}{:<16}{:<5}{:<22}{}",
                    iface.id.as_str(),
                    iface.ip.map_or_else(|| "unassigned".to_string(), |ip| ip.addr().to_string()),
                    "YES",
                    status(iface),
                    protocol(iface)
                ));
            }
        }
        Action::Hostname => {
            let name = parsed.args[0];
            if !valid_hostname(name) {
                return Err(Error::InvalidArgument {
                    what: "hostname",
                    value: name.to_string(),
                });
            }
            ctx.store.on_update_data(DevicePatch {
                hostname: Some(name.to_string()),
            });
            state.hostname = name.to_string();
        }
        Action::Interface => {
            let wanted = parsed.args[0];
            let iface = device
                .interfaces
                .iter()
                .find(|i| i.id.as_str().eq_ignore_ascii_case(wanted))
                .ok_or_else(|| Error::UnknownInterface(wanted.to_string()))?;
            state.enter(InterfaceConfig);
            state.selected_interface = Some(iface.id.clone());
        }
        Action::IpAddress => {
            let cidr = parse_address(parsed.args[0], parsed.args[1])?;
            let id = selected(state)?;
            ctx.store.on_update_interface(&id, InterfacePatch {
                ip: Some(Some(cidr)),
                ..Default::default()
            });
        }
        Action::NoIpAddress => {
            let id = selected(state)?;
            ctx.store.on_update_interface(&id, InterfacePatch {
                ip: Some(None),
                ..Default::default()
            });
        }
        Action::Shutdown | Action::NoShutdown => {
            let id = selected(state)?;
            let (admin, word) = if parsed.command.action == Action::Shutdown {
                (AdminState::Down, "administratively down")
            } else {
                (AdminState::Up, "up")
            };
            ctx.store.on_update_interface(&id, InterfacePatch {
                admin: Some(admin),
                ..Default::default()
            });
            out.push(format!("%LINK-5-CHANGED: Interface {id}, changed state to {word}"));
        }
        Action::Description => {
            let id = selected(state)?;
            ctx.store.on_update_interface(&id, InterfacePatch {
                description: Some(Some(parsed.args.join(" "))),
                ..Default::default()
            });
        }
    }

    Ok(out)
}

fn selected(state: &CliState) -> Result<InterfaceId> {
    state
        .selected_interface
        .clone()
        .ok_or(Error::Inconsistent("no interface selected"))
}

/// At most 63 ASCII letters, digits, `-` or `_`, starting with a letter.
fn valid_hostname(name: &str) -> bool {
    name.len() <= 63
        && name.starts_with(|c: char| c.is_ascii_alphabetic())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// `10.0.0.1 255.255.255.0`, `10.0.0.1 /24` or `10.0.0.1 24`.
fn parse_address(addr: &str, mask: &str) -> Result<Ipv4Cidr> {
    let ip: Ipv4Addr = addr.parse().map_err(|_| Error::InvalidArgument {
        what: "address",
        value: addr.to_string(),
    })?;
    let bad_mask = || Error::InvalidArgument {
        what: "mask",
        value: mask.to_string(),
    };

    let cidr = if mask.contains('.') {
        let mask: Ipv4Addr = mask.parse().map_err(|_| bad_mask())?;
        Ipv4Cidr::from_mask(ip, mask)
    } else {
        let prefix: u8 = mask.trim_start_matches('/').parse().map_err(|_| bad_mask())?;
        Ipv4Cidr::new(ip, prefix)
    };
    cidr.map_err(|_| bad_mask())
}

fn status(iface: &Interface) -> &'static str {
    match iface.admin {
        AdminState::Up => "up",
        AdminState::Down => "administratively down",
    }
}

fn protocol(iface: &Interface) -> &'static str {
    if iface.is_up() && iface.connected_edge_id.is_some() {
        "up"
    } else {
        "down"
    }
}

fn interface_detail(device: &Device, iface: &Interface) -> Vec<String> {
    let mut lines = vec![
        format!("{} is {}, line protocol is {}", iface.id, status(iface), protocol(iface)),
        format!(
            "  Hardware is {:?}, address is {}",
            iface.media,
            iface.effective_mac(&device.id)
        ),
    ];
    if let Some(description) = &iface.description {
        lines.push(format!("  Description: {description}"));
    }
    match iface.ip {
        Some(ip) => lines.push(format!("  Internet address is {ip}")),
        None => lines.push("  No Internet address assigned".to_string()),
    }
    if let Some(edge) = &iface.connected_edge_id {
        lines.push(format!("  Connected via link {edge}"));
    }
    lines
}

fn running_config(hostname: &str, device: &Device) -> Vec<String> {
    let mut lines = vec![
        "Building configuration...".to_string(),
        "!".to_string(),
        format!("hostname {hostname}"),
        "!".to_string(),
    ];
    for iface in &device.interfaces {
        lines.push(format!("interface {}", iface.id));
        if let Some(description) = &iface.description {
            lines.push(format!(" description {description}"));
        }
        match iface.ip {
            Some(ip) => lines.push(format!(" ip address {} {}", ip.addr(), ip.netmask())),
            None => lines.push(" no ip address".to_string()),
        }
        if !iface.is_up() {
            lines.push(" shutdown".to_string());
        }
        lines.push("!".to_string());
    }
    for route in &device.static_routes {
        lines.push(format!("ip route {} {}", route.addr(), route.netmask()));
    }
    lines.push("end".to_string());
    lines
}
