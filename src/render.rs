//! Presentational shells for thumbnails

use crate::errors::Result;
use crate::model::{TackableMeasure, TackableStatus};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::io::Write;

pub const DEFAULT_COST: &str = "Low";

/// Everything a shell needs to draw one thumbnail
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ThumbnailProps {
    pub title: String,
    pub cost: String,
    #[serde(rename = "srcIcon")]
    pub src_icon: String,
    pub metric: TackableMeasure,
    pub state: TackableStatus,
}

pub trait ThumbnailRenderer {
    fn render(&mut self, props: &ThumbnailProps) -> Result<()>;
}

/// Human readable block, one field per line
pub struct TextRenderer<W: Write> {
    out: W,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ThumbnailRenderer for TextRenderer<W> {
    fn render(&mut self, props: &ThumbnailProps) -> Result<()> {
        writeln!(self.out, "{} [{}]", props.title, props.state.label)?;
        writeln!(self.out, "  {}: {}", props.metric.name, props.metric.value)?;
        writeln!(self.out, "  cost: {}", props.cost)?;
        writeln!(self.out, "  icon: {}", props.src_icon)?;
        self.out.flush()?;
        Ok(())
    }
}

#[derive(Serialize)]
struct RenderedThumbnail<'a> {
    #[serde(flatten)]
    props: &'a ThumbnailProps,
    rendered_at: String,
}

/// One JSON document per render, newline terminated
pub struct JsonRenderer<W: Write> {
    out: W,
}

impl<W: Write> JsonRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ThumbnailRenderer for JsonRenderer<W> {
    fn render(&mut self, props: &ThumbnailProps) -> Result<()> {
        let rendered = RenderedThumbnail {
            props,
            rendered_at: Utc::now().to_rfc3339(),
        };
        serde_json::to_writer(&mut self.out, &rendered)?;
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props() -> ThumbnailProps {
        ThumbnailProps {
            title: "In Game Survey".to_string(),
            cost: DEFAULT_COST.to_string(),
            src_icon: "icon.png".to_string(),
            metric: TackableMeasure::count(4),
            state: TackableStatus::online(),
        }
    }

    #[test]
    fn test_text_renderer() {
        let mut renderer = TextRenderer::new(Vec::new());
        renderer.render(&props()).unwrap();

        let text = String::from_utf8(renderer.into_inner()).unwrap();
        assert!(text.starts_with("In Game Survey [Online]\n"));
        assert!(text.contains("  Active Survey(s): 4\n"));
        assert!(text.contains("  cost: Low\n"));
    }

    #[test]
    fn test_json_renderer() {
        let mut renderer = JsonRenderer::new(Vec::new());
        renderer.render(&props()).unwrap();

        let output = renderer.into_inner();
        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(value["title"], "In Game Survey");
        assert_eq!(value["srcIcon"], "icon.png");
        assert_eq!(value["metric"]["value"], 4);
        assert_eq!(value["state"]["styleType"], "Enabled");
        assert!(value["rendered_at"].is_string());
    }
}
