//! Spacing resolution: effective height/margin modes and padding
//!
//! Stored settings are merged with type defaults, then an enabled FX
//! override may replace them. An override that fails to evaluate, or
//! yields something that is not an allowed value, is ignored and the
//! static setting stays in effect.

use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;

use crate::fx::{strip_wrapper, to_js_string, FxError};
use crate::widget::{HeightMode, MarginMode, WidgetRegistry, WidgetSpacing};

/// Padding used when the margin mode is `none`
pub const ZERO_PADDING: &str = "0";

/// Effective spacing modes of a widget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpacingModes {
    pub height_mode: HeightMode,
    pub margin_mode: MarginMode,
}

/// Page container spacing, read from a page's `pageMeta`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PageSpacing {
    pub padding_mode: Option<MarginMode>,
    pub padding_fx_enabled: bool,
    pub padding_fx: Option<String>,
}

impl PageSpacing {
    /// Spacing settings from `pageMeta`; anything unreadable is the default
    pub fn from_meta(meta: &Value) -> Self {
        serde_json::from_value(meta.clone()).unwrap_or_default()
    }
}

/// Strip surrounding whitespace and one pair of matching quotes
fn unquote(text: &str) -> &str {
    let text = text.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = text
            .strip_prefix(quote)
            .and_then(|t| t.strip_suffix(quote))
        {
            return inner.trim();
        }
    }
    text
}

/// Text of an FX result, unwrapped the same way as the source
fn result_text(value: &Value) -> String {
    match value {
        Value::String(s) => unquote(strip_wrapper(s)).to_string(),
        other => to_js_string(other),
    }
}

/// Evaluate an enabled override and return its text, if any
fn override_text<F>(enabled: bool, source: Option<&str>, evaluate_fx: &F) -> Option<String>
where
    F: Fn(&str) -> Result<Value, FxError>,
{
    let source = source.map(str::trim).filter(|s| enabled && !s.is_empty())?;
    match evaluate_fx(source) {
        Ok(value) => Some(result_text(&value)),
        Err(err) => {
            tracing::warn!(source, error = %err, "spacing override failed; using static value");
            None
        }
    }
}

/// Mode named by an override; a bare literal is accepted without
/// evaluation
fn override_mode<T, F>(enabled: bool, source: Option<&str>, evaluate_fx: &F) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Result<Value, FxError>,
{
    if let Some(mode) = source
        .filter(|_| enabled)
        .and_then(|s| unquote(strip_wrapper(s)).parse().ok())
    {
        return Some(mode);
    }
    override_text(enabled, source, evaluate_fx).and_then(|text| text.parse().ok())
}

/// Type defaults merged with stored settings, without overrides
pub fn default_spacing_modes(
    widget_type: &str,
    spacing: Option<&WidgetSpacing>,
    registry: &dyn WidgetRegistry,
) -> SpacingModes {
    SpacingModes {
        height_mode: spacing
            .and_then(|s| s.height_mode)
            .unwrap_or_else(|| registry.default_height_mode(widget_type)),
        margin_mode: spacing
            .and_then(|s| s.margin_mode)
            .unwrap_or(MarginMode::Normal),
    }
}

/// Effective height and margin modes of a widget.
///
/// `evaluate_fx` evaluates an override expression; its failures never
/// escape this function.
pub fn resolve_widget_spacing_modes<F>(
    widget_type: &str,
    spacing: Option<&WidgetSpacing>,
    registry: &dyn WidgetRegistry,
    evaluate_fx: F,
) -> SpacingModes
where
    F: Fn(&str) -> Result<Value, FxError>,
{
    let mut modes = default_spacing_modes(widget_type, spacing, registry);
    let Some(spacing) = spacing else {
        return modes;
    };
    if let Some(mode) = override_mode(
        spacing.height_fx_enabled,
        spacing.height_fx.as_deref(),
        &evaluate_fx,
    ) {
        modes.height_mode = mode;
    }
    if let Some(mode) = override_mode(
        spacing.margin_fx_enabled,
        spacing.margin_fx.as_deref(),
        &evaluate_fx,
    ) {
        modes.margin_mode = mode;
    }
    modes
}

/// Padding for a margin mode
fn mode_padding(mode: MarginMode, normal: &str) -> String {
    match mode {
        MarginMode::Normal => normal.to_string(),
        MarginMode::None => ZERO_PADDING.to_string(),
    }
}

/// One CSS length such as `4px`, `0`, `1.5rem` or `10%`
fn is_css_length(token: &str) -> bool {
    if token == "auto" {
        return true;
    }
    let number_end = token
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || (i == 0 && c == '-')))
        .map(|(i, _)| i)
        .unwrap_or(token.len());
    let (number, unit) = token.split_at(number_end);
    number.parse::<f64>().is_ok() && matches!(unit, "" | "px" | "rem" | "em" | "%" | "vh" | "vw")
}

/// One to four CSS lengths
fn is_padding_shorthand(text: &str) -> bool {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    (1..=4).contains(&tokens.len()) && tokens.iter().all(|t| is_css_length(t))
}

/// Padding from an override: a mode literal or a CSS shorthand
fn override_padding<F>(enabled: bool, source: Option<&str>, evaluate_fx: &F, normal: &str) -> Option<String>
where
    F: Fn(&str) -> Result<Value, FxError>,
{
    if let Some(mode) = override_mode::<MarginMode, F>(enabled, source, evaluate_fx) {
        return Some(mode_padding(mode, normal));
    }
    let literal = source
        .filter(|_| enabled)
        .map(|s| unquote(strip_wrapper(s)).to_string())
        .filter(|t| is_padding_shorthand(t));
    literal
        .or_else(|| override_text(enabled, source, evaluate_fx))
        .filter(|t| is_padding_shorthand(t))
}

/// Widget padding: the margin override if it yields a usable value,
/// otherwise `normal_padding` or zero depending on `margin_mode`
pub fn resolve_spacing_padding<F>(
    margin_mode: MarginMode,
    spacing: Option<&WidgetSpacing>,
    evaluate_fx: F,
    normal_padding: &str,
) -> String
where
    F: Fn(&str) -> Result<Value, FxError>,
{
    spacing
        .and_then(|s| {
            override_padding(
                s.margin_fx_enabled,
                s.margin_fx.as_deref(),
                &evaluate_fx,
                normal_padding,
            )
        })
        .unwrap_or_else(|| mode_padding(margin_mode, normal_padding))
}

/// Padding of the page container
pub fn resolve_page_padding_value<F>(spacing: &PageSpacing, evaluate_fx: F, normal_padding: &str) -> String
where
    F: Fn(&str) -> Result<Value, FxError>,
{
    override_padding(
        spacing.padding_fx_enabled,
        spacing.padding_fx.as_deref(),
        &evaluate_fx,
        normal_padding,
    )
    .unwrap_or_else(|| mode_padding(spacing.padding_mode.unwrap_or(MarginMode::Normal), normal_padding))
}
