use ratatui::style::Color;
use rowpeek::config::{rgb_to_256_color, rgb_to_basic_ansi, ColorParser, Theme, ThemeConfig};

fn parser() -> ColorParser {
    ColorParser::with_capabilities(false, true)
}

#[test]
fn test_parse_basic_ansi_colors() {
    let parser = parser();
    assert_eq!(parser.parse("black").unwrap(), Color::Black);
    assert_eq!(parser.parse("red").unwrap(), Color::Red);
    assert_eq!(parser.parse("green").unwrap(), Color::Green);
    assert_eq!(parser.parse("cyan").unwrap(), Color::Cyan);
    assert_eq!(parser.parse("white").unwrap(), Color::White);
}

#[test]
fn test_parse_bright_and_gray_aliases() {
    let parser = parser();
    assert_eq!(parser.parse("bright_red").unwrap(), Color::Indexed(9));
    assert_eq!(parser.parse("bright red").unwrap(), Color::Indexed(9));
    assert_eq!(parser.parse("bright_cyan").unwrap(), Color::Indexed(14));
    assert_eq!(parser.parse("grey").unwrap(), Color::Indexed(8));
    assert_eq!(parser.parse("dark gray").unwrap(), Color::Indexed(8));
    assert_eq!(parser.parse("light_gray").unwrap(), Color::Indexed(7));
}

#[test]
fn test_parse_case_and_whitespace() {
    let parser = parser();
    assert_eq!(parser.parse("RED").unwrap(), Color::Red);
    assert_eq!(parser.parse("  cyan ").unwrap(), Color::Cyan);
    assert_eq!(parser.parse("INDEXED(236)").unwrap(), Color::Indexed(236));
    assert_eq!(parser.parse("reset").unwrap(), Color::Reset);
    assert_eq!(parser.parse("default").unwrap(), Color::Reset);
}

#[test]
fn test_parse_invalid_values() {
    let parser = parser();
    assert!(parser.parse("#ff00").is_err());
    assert!(parser.parse("#gggggg").is_err());
    assert!(parser.parse("ff0000").is_err());
    assert!(parser.parse("indexed(-1)").is_err());
    assert!(parser.parse("indexed()").is_err());
    assert!(parser.parse("indexed(999)").is_err());
    let err = parser.parse("unknowncolor").unwrap_err();
    assert!(err.to_string().contains("Unknown color"));
}

#[test]
fn test_rgb_to_256_color() {
    assert_eq!(rgb_to_256_color(0, 0, 0), 16);
    assert_eq!(rgb_to_256_color(255, 255, 255), 231);
    assert_eq!(rgb_to_256_color(255, 0, 0), 196);
    assert_eq!(rgb_to_256_color(0, 0, 255), 21);
    let gray = rgb_to_256_color(128, 128, 128);
    assert!((232..=255).contains(&gray));
}

#[test]
fn test_rgb_to_basic_ansi() {
    assert_eq!(rgb_to_basic_ansi(10, 10, 10), Color::Black);
    assert_eq!(rgb_to_basic_ansi(240, 240, 240), Color::White);
    assert_eq!(rgb_to_basic_ansi(200, 20, 20), Color::Red);
    assert_eq!(rgb_to_basic_ansi(20, 200, 200), Color::Cyan);
}

#[test]
fn test_theme_from_custom_config() {
    let mut config = ThemeConfig::default();
    config.colors.scrollbar = "#00ff00".to_string();
    config.colors.error = "bright_red".to_string();

    let theme = Theme::from_config_with(&config, &ColorParser::with_capabilities(true, true)).unwrap();
    assert_eq!(theme.get("scrollbar"), Color::Rgb(0, 255, 0));
    assert_eq!(theme.get("error"), Color::Indexed(9));
    assert_eq!(theme.get("unknown"), Color::Reset);

    config.colors.primary = "not-a-color".to_string();
    assert!(Theme::from_config_with(&config, &parser()).is_err());
}
