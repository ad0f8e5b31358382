use clap::ValueEnum;
use crossterm::style::Color;

/// Built-in themes, selectable with `--theme` and cycled with `t`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ThemeName {
    Dark,
    Light,
    HighContrast,
}

impl ThemeName {
    pub fn next(self) -> Self {
        match self {
            ThemeName::Dark => ThemeName::Light,
            ThemeName::Light => ThemeName::HighContrast,
            ThemeName::HighContrast => ThemeName::Dark,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ThemeName::Dark => "Dark",
            ThemeName::Light => "Light",
            ThemeName::HighContrast => "High contrast",
        }
    }
}

/// Color theme for the TUI
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: ThemeName,
    /// Background color
    pub bg: Color,
    /// Default text color
    pub fg: Color,
    /// Grid border color
    pub border: Color,
    /// Numbered waypoint color
    pub waypoint: Color,
    /// Path segments and visited markers
    pub path: Color,
    /// Visited cell background
    pub path_bg: Color,
    /// Cursor cell background
    pub cursor_bg: Color,
    /// Rejected-move flash background
    pub flash_bg: Color,
    /// Success/complete color
    pub success: Color,
    /// Lock overlay text
    pub locked: Color,
    /// Timer/info text color
    pub info: Color,
    /// Key binding text color
    pub key: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    pub fn named(name: ThemeName) -> Self {
        match name {
            ThemeName::Dark => Self::dark(),
            ThemeName::Light => Self::light(),
            ThemeName::HighContrast => Self::high_contrast(),
        }
    }

    /// Dark theme (default)
    pub fn dark() -> Self {
        Self {
            name: ThemeName::Dark,
            bg: Color::Rgb { r: 20, g: 22, b: 30 },
            fg: Color::Rgb { r: 230, g: 230, b: 240 },
            border: Color::Rgb { r: 70, g: 75, b: 90 },
            waypoint: Color::Rgb { r: 255, g: 255, b: 255 },
            path: Color::Rgb { r: 255, g: 150, b: 60 },
            path_bg: Color::Rgb { r: 70, g: 45, b: 30 },
            cursor_bg: Color::Rgb { r: 70, g: 90, b: 140 },
            flash_bg: Color::Rgb { r: 150, g: 40, b: 40 },
            success: Color::Rgb { r: 90, g: 255, b: 130 },
            locked: Color::Rgb { r: 255, g: 210, b: 100 },
            info: Color::Rgb { r: 160, g: 165, b: 185 },
            key: Color::Rgb { r: 255, g: 210, b: 100 },
        }
    }

    /// Light theme
    pub fn light() -> Self {
        Self {
            name: ThemeName::Light,
            bg: Color::Rgb { r: 248, g: 248, b: 252 },
            fg: Color::Rgb { r: 30, g: 30, b: 40 },
            border: Color::Rgb { r: 180, g: 180, b: 195 },
            waypoint: Color::Rgb { r: 0, g: 0, b: 0 },
            path: Color::Rgb { r: 210, g: 90, b: 20 },
            path_bg: Color::Rgb { r: 255, g: 225, b: 195 },
            cursor_bg: Color::Rgb { r: 180, g: 200, b: 255 },
            flash_bg: Color::Rgb { r: 255, g: 170, b: 170 },
            success: Color::Rgb { r: 40, g: 160, b: 60 },
            locked: Color::Rgb { r: 160, g: 90, b: 10 },
            info: Color::Rgb { r: 90, g: 90, b: 110 },
            key: Color::Rgb { r: 200, g: 120, b: 20 },
        }
    }

    /// High contrast theme
    pub fn high_contrast() -> Self {
        Self {
            name: ThemeName::HighContrast,
            bg: Color::Black,
            fg: Color::White,
            border: Color::Grey,
            waypoint: Color::Yellow,
            path: Color::Cyan,
            path_bg: Color::DarkBlue,
            cursor_bg: Color::Blue,
            flash_bg: Color::Red,
            success: Color::Green,
            locked: Color::Yellow,
            info: Color::Grey,
            key: Color::Yellow,
        }
    }
}
