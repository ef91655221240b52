//! Keybinding registry: maps key events to actions, with config overrides.
//!
//! Bindings are looked up per context (entry list or feed sidebar) and fall
//! back to the global table. The `[keybindings]` table of config.toml can
//! rebind any action by name.
use crossterm::event::{KeyCode, KeyModifiers};
use std::collections::HashMap;

// ============================================================================
// Action Enum
// ============================================================================

/// All user-facing actions that can be triggered by keybindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Quit,
    NextEntry,
    PrevEntry,
    OpenLink,
    ToggleOpen,
    ToggleRead,
    ToggleSaved,
    MarkAllRead,
    SwitchMode,
    ToggleOrder,
    ShowUnread,
    ShowAll,
    ShowSaved,
    ToggleFeeds,
    FocusFeeds,
    PageDown,
    PageUp,
    ShowHelp,
    FeedDown,
    FeedUp,
    SelectFeed,
}

impl Action {
    /// Human-readable description for the help screen.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Quit => "Quit application",
            Self::NextEntry => "Next entry",
            Self::PrevEntry => "Previous entry",
            Self::OpenLink => "Open entry link in browser",
            Self::ToggleOpen => "Open / close entry (list mode)",
            Self::ToggleRead => "Toggle read",
            Self::ToggleSaved => "Toggle saved",
            Self::MarkAllRead => "Mark all as read",
            Self::SwitchMode => "Switch expanded / list mode",
            Self::ToggleOrder => "Toggle newest / oldest first",
            Self::ShowUnread => "Show unread items",
            Self::ShowAll => "Show all items",
            Self::ShowSaved => "Show saved items",
            Self::ToggleFeeds => "Show / hide feed sidebar",
            Self::FocusFeeds => "Switch focus to / from feeds",
            Self::PageDown => "Scroll down one page",
            Self::PageUp => "Scroll up one page",
            Self::ShowHelp => "Show help",
            Self::FeedDown => "Next feed",
            Self::FeedUp => "Previous feed",
            Self::SelectFeed => "Show selected feed",
        }
    }
}

// ============================================================================
// Context Enum
// ============================================================================

/// Dispatch context: determines which bindings are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Context {
    Global,
    Entries,
    Feeds,
}

// ============================================================================
// Key Specification
// ============================================================================

/// A key event: code + modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeySpec {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeySpec {
    pub const fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    pub const fn plain(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    pub const fn ctrl(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    /// Terminals report `A` as `Char('A')` plus SHIFT; the case already
    /// carries the shift, so drop the modifier for character keys.
    fn normalized(self) -> Self {
        match self.code {
            KeyCode::Char(_) => Self::new(self.code, self.modifiers.difference(KeyModifiers::SHIFT)),
            _ => self,
        }
    }
}

/// Parse a key string from config into a KeySpec.
///
/// Supported formats:
/// - Single char: "q", "j", "A"
/// - Named keys: "Enter", "Esc", "Tab", "Up", "Down", "Space", "PageDown"
/// - Modifier combos: "Ctrl+d"
/// - Function keys: "F1" through "F12"
fn parse_key_string(s: &str) -> Option<KeySpec> {
    let s = s.trim();

    if let Some(rest) = s.strip_prefix("Ctrl+") {
        let mut chars = rest.trim().chars();
        return match (chars.next(), chars.next()) {
            (Some(c), None) => Some(KeySpec::ctrl(c)),
            _ => None,
        };
    }

    // Named keys (case-insensitive)
    match s.to_lowercase().as_str() {
        "enter" | "return" => return Some(KeySpec::plain(KeyCode::Enter)),
        "esc" | "escape" => return Some(KeySpec::plain(KeyCode::Esc)),
        "tab" => return Some(KeySpec::plain(KeyCode::Tab)),
        "up" => return Some(KeySpec::plain(KeyCode::Up)),
        "down" => return Some(KeySpec::plain(KeyCode::Down)),
        "left" => return Some(KeySpec::plain(KeyCode::Left)),
        "right" => return Some(KeySpec::plain(KeyCode::Right)),
        "pagedown" => return Some(KeySpec::plain(KeyCode::PageDown)),
        "pageup" => return Some(KeySpec::plain(KeyCode::PageUp)),
        "home" => return Some(KeySpec::plain(KeyCode::Home)),
        "end" => return Some(KeySpec::plain(KeyCode::End)),
        "space" => return Some(KeySpec::plain(KeyCode::Char(' '))),
        _ => {}
    }

    if let Some(n) = s
        .strip_prefix(['F', 'f'])
        .and_then(|n| n.parse::<u8>().ok())
    {
        if (1..=12).contains(&n) {
            return Some(KeySpec::plain(KeyCode::F(n)));
        }
    }

    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(KeySpec::plain(KeyCode::Char(c))),
        _ => None,
    }
}

/// Format a KeySpec as a human-readable string for the help screen.
fn format_key(key: &KeySpec) -> String {
    let modifier = if key.modifiers.contains(KeyModifiers::CONTROL) {
        "Ctrl+"
    } else {
        ""
    };

    let key_name = match key.code {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::Up => "Up".to_string(),
        KeyCode::Down => "Down".to_string(),
        KeyCode::Left => "Left".to_string(),
        KeyCode::Right => "Right".to_string(),
        KeyCode::PageDown => "PageDown".to_string(),
        KeyCode::PageUp => "PageUp".to_string(),
        KeyCode::Home => "Home".to_string(),
        KeyCode::End => "End".to_string(),
        KeyCode::F(n) => format!("F{}", n),
        _ => "?".to_string(),
    };

    format!("{}{}", modifier, key_name)
}

// ============================================================================
// Keybinding Registry
// ============================================================================

/// Registry of keybindings, supporting default bindings and config overrides.
///
/// The same key can map to different actions in different contexts: `j`
/// moves between entries in the list and between feeds in the sidebar.
pub struct KeybindingRegistry {
    /// Primary lookup: (Context, KeySpec) -> Action
    lookup: HashMap<(Context, KeySpec), Action>,
    /// All bindings in registration order, for the help screen
    bindings: Vec<(Context, KeySpec, Action)>,
}

impl KeybindingRegistry {
    /// Create a registry with the default bindings.
    pub fn new() -> Self {
        let mut registry = Self {
            lookup: HashMap::new(),
            bindings: Vec::new(),
        };
        registry.register_defaults();
        registry
    }

    fn bind(&mut self, context: Context, key: KeySpec, action: Action) {
        self.lookup.insert((context, key), action);
        self.bindings.push((context, key, action));
    }

    fn bind_all(&mut self, context: Context, keys: &[KeySpec], action: Action) {
        for key in keys {
            self.bind(context, *key, action);
        }
    }

    fn register_defaults(&mut self) {
        use KeyCode::Char;

        // === Global ===
        self.bind_all(
            Context::Global,
            &[KeySpec::plain(Char('q')), KeySpec::plain(KeyCode::Esc)],
            Action::Quit,
        );
        self.bind(Context::Global, KeySpec::ctrl('c'), Action::Quit);
        self.bind(Context::Global, KeySpec::plain(Char('?')), Action::ShowHelp);
        self.bind(Context::Global, KeySpec::plain(Char('f')), Action::ToggleFeeds);
        self.bind(Context::Global, KeySpec::plain(KeyCode::Tab), Action::FocusFeeds);
        self.bind(Context::Global, KeySpec::plain(Char('m')), Action::SwitchMode);
        self.bind(Context::Global, KeySpec::plain(Char('O')), Action::ToggleOrder);
        self.bind(Context::Global, KeySpec::plain(Char('1')), Action::ShowUnread);
        self.bind(Context::Global, KeySpec::plain(Char('2')), Action::ShowAll);
        self.bind(Context::Global, KeySpec::plain(Char('3')), Action::ShowSaved);
        self.bind(Context::Global, KeySpec::plain(Char('A')), Action::MarkAllRead);

        // === Entry list ===
        self.bind_all(
            Context::Entries,
            &[
                KeySpec::plain(Char('j')),
                KeySpec::plain(Char('n')),
                KeySpec::plain(KeyCode::Down),
            ],
            Action::NextEntry,
        );
        self.bind_all(
            Context::Entries,
            &[
                KeySpec::plain(Char('k')),
                KeySpec::plain(Char('p')),
                KeySpec::plain(KeyCode::Up),
            ],
            Action::PrevEntry,
        );
        self.bind_all(
            Context::Entries,
            &[KeySpec::plain(KeyCode::Enter), KeySpec::plain(Char('v'))],
            Action::OpenLink,
        );
        self.bind(Context::Entries, KeySpec::plain(Char('o')), Action::ToggleOpen);
        self.bind(Context::Entries, KeySpec::plain(Char('r')), Action::ToggleRead);
        self.bind(Context::Entries, KeySpec::plain(Char('s')), Action::ToggleSaved);
        self.bind_all(
            Context::Entries,
            &[
                KeySpec::plain(Char(' ')),
                KeySpec::plain(KeyCode::PageDown),
                KeySpec::ctrl('d'),
            ],
            Action::PageDown,
        );
        self.bind_all(
            Context::Entries,
            &[
                KeySpec::plain(Char('b')),
                KeySpec::plain(KeyCode::PageUp),
                KeySpec::ctrl('u'),
            ],
            Action::PageUp,
        );

        // === Feed sidebar ===
        self.bind_all(
            Context::Feeds,
            &[KeySpec::plain(Char('j')), KeySpec::plain(KeyCode::Down)],
            Action::FeedDown,
        );
        self.bind_all(
            Context::Feeds,
            &[KeySpec::plain(Char('k')), KeySpec::plain(KeyCode::Up)],
            Action::FeedUp,
        );
        self.bind(Context::Feeds, KeySpec::plain(KeyCode::Enter), Action::SelectFeed);
    }

    /// Apply user overrides from the config `[keybindings]` table.
    ///
    /// Keys in the map are action names (e.g., "quit", "next_entry").
    /// Values are key strings (e.g., "q", "Ctrl+d", "F5").
    ///
    /// Returns a list of warnings for unrecognized action names or unparseable keys.
    pub fn apply_overrides(&mut self, overrides: &HashMap<String, String>) -> Vec<String> {
        let mut warnings = Vec::new();

        for (action_name, key_str) in overrides {
            let Some(action) = parse_action_name(action_name) else {
                warnings.push(format!("Unknown action '{}', ignoring", action_name));
                continue;
            };

            let Some(key) = parse_key_string(key_str) else {
                warnings.push(format!(
                    "Cannot parse key '{}' for action '{}', ignoring",
                    key_str, action_name
                ));
                continue;
            };

            let mut contexts: Vec<Context> = self
                .bindings
                .iter()
                .filter(|(_, _, a)| *a == action)
                .map(|(c, _, _)| *c)
                .collect();
            contexts.dedup();

            self.lookup.retain(|_, a| *a != action);
            self.bindings.retain(|(_, _, a)| *a != action);

            for ctx in contexts {
                self.bind(ctx, key, action);
            }

            tracing::info!(
                action = %action_name,
                key = %key_str,
                "Applied keybinding override"
            );
        }

        warnings
    }

    /// Look up the action for a given key in a given context.
    ///
    /// Tries the specific context first, then falls back to Global.
    pub fn action_for_key(
        &self,
        code: KeyCode,
        modifiers: KeyModifiers,
        context: Context,
    ) -> Option<Action> {
        let key = KeySpec::new(code, modifiers).normalized();

        if let Some(&action) = self.lookup.get(&(context, key)) {
            return Some(action);
        }

        if context != Context::Global {
            if let Some(&action) = self.lookup.get(&(Context::Global, key)) {
                return Some(action);
            }
        }

        None
    }

    /// Get all bindings for the help screen.
    ///
    /// Returns (context, key_display_string, action, description) tuples.
    pub fn all_bindings(&self) -> Vec<(Context, String, Action, &'static str)> {
        self.bindings
            .iter()
            .map(|(ctx, key, action)| (*ctx, format_key(key), *action, action.describe()))
            .collect()
    }
}

impl Default for KeybindingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse an action name string (from config) into an Action enum.
fn parse_action_name(name: &str) -> Option<Action> {
    match name.to_lowercase().as_str() {
        "quit" => Some(Action::Quit),
        "next_entry" | "next" => Some(Action::NextEntry),
        "prev_entry" | "previous_entry" | "prev" => Some(Action::PrevEntry),
        "open_link" | "open" => Some(Action::OpenLink),
        "toggle_open" => Some(Action::ToggleOpen),
        "toggle_read" | "read" => Some(Action::ToggleRead),
        "toggle_saved" | "saved" | "save" => Some(Action::ToggleSaved),
        "mark_all_read" => Some(Action::MarkAllRead),
        "switch_mode" | "mode" => Some(Action::SwitchMode),
        "toggle_order" | "order" => Some(Action::ToggleOrder),
        "show_unread" | "unread" => Some(Action::ShowUnread),
        "show_all" | "all" => Some(Action::ShowAll),
        "show_saved" => Some(Action::ShowSaved),
        "toggle_feeds" => Some(Action::ToggleFeeds),
        "focus_feeds" => Some(Action::FocusFeeds),
        "page_down" => Some(Action::PageDown),
        "page_up" => Some(Action::PageUp),
        "show_help" | "help" => Some(Action::ShowHelp),
        "feed_down" => Some(Action::FeedDown),
        "feed_up" => Some(Action::FeedUp),
        "select_feed" => Some(Action::SelectFeed),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================
