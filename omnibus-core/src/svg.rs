/*!
Minimal SVG document model for the network map.

Shapes are plain value structs with chained setters, collected into a
[`Document`] as one tagged [`Shape`] enum and rendered to text through
[`std::fmt::Display`]. Text content and attribute values are escaped with
the five XML character entities.
*/

use std::fmt::{self, Display, Write};

use serde::{Deserialize, Serialize};

/// A colour as it appears in render settings: a named colour, an opaque
/// `rgb` triple or an `rgba` quadruple.
///
/// The untagged representation matches the request document, where a colour
/// is either a string or an array of three or four numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Color {
    Name(String),
    Rgb(u8, u8, u8),
    Rgba(u8, u8, u8, f64),
}

impl Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Name(name) => f.write_str(name),
            Color::Rgb(red, green, blue) => write!(f, "rgb({red},{green},{blue})"),
            Color::Rgba(red, green, blue, opacity) => {
                write!(f, "rgba({red},{green},{blue},{opacity})")
            }
        }
    }
}

impl From<&str> for Color {
    fn from(name: &str) -> Self {
        Color::Name(name.to_owned())
    }
}

/// A point on the rendered canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrokeLineCap {
    Butt,
    Round,
    Square,
}

impl Display for StrokeLineCap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StrokeLineCap::Butt => "butt",
            StrokeLineCap::Round => "round",
            StrokeLineCap::Square => "square",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrokeLineJoin {
    Miter,
    Round,
    Bevel,
}

impl Display for StrokeLineJoin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StrokeLineJoin::Miter => "miter",
            StrokeLineJoin::Round => "round",
            StrokeLineJoin::Bevel => "bevel",
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct Circle {
    center: Point,
    radius: f64,
    fill: Option<Color>,
}

impl Circle {
    #[must_use]
    pub fn center(mut self, center: Point) -> Self {
        self.center = center;
        self
    }

    #[must_use]
    pub fn radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    #[must_use]
    pub fn fill(mut self, color: impl Into<Color>) -> Self {
        self.fill = Some(color.into());
        self
    }
}

impl Display for Circle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  <circle cx=\"{}\" cy=\"{}\" r=\"{}\"",
            self.center.x, self.center.y, self.radius
        )?;
        if let Some(fill) = &self.fill {
            write!(f, " fill=\"{}\"", Escaped(&fill.to_string()))?;
        }
        f.write_str("/>\n")
    }
}

#[derive(Debug, Clone, Default)]
pub struct Polyline {
    points: Vec<Point>,
    fill: Option<Color>,
    stroke: Option<Color>,
    stroke_width: Option<f64>,
    line_cap: Option<StrokeLineCap>,
    line_join: Option<StrokeLineJoin>,
}

impl Polyline {
    #[must_use]
    pub fn point(mut self, point: Point) -> Self {
        self.points.push(point);
        self
    }

    #[must_use]
    pub fn fill(mut self, color: impl Into<Color>) -> Self {
        self.fill = Some(color.into());
        self
    }

    #[must_use]
    pub fn stroke(mut self, color: impl Into<Color>) -> Self {
        self.stroke = Some(color.into());
        self
    }

    #[must_use]
    pub fn stroke_width(mut self, width: f64) -> Self {
        self.stroke_width = Some(width);
        self
    }

    #[must_use]
    pub fn line_cap(mut self, cap: StrokeLineCap) -> Self {
        self.line_cap = Some(cap);
        self
    }

    #[must_use]
    pub fn line_join(mut self, join: StrokeLineJoin) -> Self {
        self.line_join = Some(join);
        self
    }
}

impl Display for Polyline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("  <polyline points=\"")?;
        for (index, point) in self.points.iter().enumerate() {
            if index > 0 {
                f.write_char(' ')?;
            }
            write!(f, "{},{}", point.x, point.y)?;
        }
        f.write_char('"')?;
        if let Some(fill) = &self.fill {
            write!(f, " fill=\"{}\"", Escaped(&fill.to_string()))?;
        }
        if let Some(stroke) = &self.stroke {
            write!(f, " stroke=\"{}\"", Escaped(&stroke.to_string()))?;
        }
        if let Some(width) = self.stroke_width {
            write!(f, " stroke-width=\"{width}\"")?;
        }
        if let Some(cap) = self.line_cap {
            write!(f, " stroke-linecap=\"{cap}\"")?;
        }
        if let Some(join) = self.line_join {
            write!(f, " stroke-linejoin=\"{join}\"")?;
        }
        f.write_str("/>\n")
    }
}

#[derive(Debug, Clone, Default)]
pub struct Text {
    position: Point,
    offset: Point,
    font_size: u32,
    font_family: Option<String>,
    font_weight: Option<String>,
    fill: Option<Color>,
    stroke: Option<Color>,
    stroke_width: Option<f64>,
    line_cap: Option<StrokeLineCap>,
    line_join: Option<StrokeLineJoin>,
    content: String,
}

impl Text {
    #[must_use]
    pub fn position(mut self, position: Point) -> Self {
        self.position = position;
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: Point) -> Self {
        self.offset = offset;
        self
    }

    #[must_use]
    pub fn font_size(mut self, size: u32) -> Self {
        self.font_size = size;
        self
    }

    #[must_use]
    pub fn font_family(mut self, family: &str) -> Self {
        self.font_family = Some(family.to_owned());
        self
    }

    #[must_use]
    pub fn font_weight(mut self, weight: &str) -> Self {
        self.font_weight = Some(weight.to_owned());
        self
    }

    #[must_use]
    pub fn fill(mut self, color: impl Into<Color>) -> Self {
        self.fill = Some(color.into());
        self
    }

    #[must_use]
    pub fn stroke(mut self, color: impl Into<Color>) -> Self {
        self.stroke = Some(color.into());
        self
    }

    #[must_use]
    pub fn stroke_width(mut self, width: f64) -> Self {
        self.stroke_width = Some(width);
        self
    }

    #[must_use]
    pub fn line_cap(mut self, cap: StrokeLineCap) -> Self {
        self.line_cap = Some(cap);
        self
    }

    #[must_use]
    pub fn line_join(mut self, join: StrokeLineJoin) -> Self {
        self.line_join = Some(join);
        self
    }

    #[must_use]
    pub fn content(mut self, content: &str) -> Self {
        self.content = content.to_owned();
        self
    }
}

impl Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  <text x=\"{}\" y=\"{}\" dx=\"{}\" dy=\"{}\" font-size=\"{}\"",
            self.position.x, self.position.y, self.offset.x, self.offset.y, self.font_size
        )?;
        if let Some(family) = &self.font_family {
            write!(f, " font-family=\"{}\"", Escaped(family))?;
        }
        if let Some(weight) = &self.font_weight {
            write!(f, " font-weight=\"{}\"", Escaped(weight))?;
        }
        if let Some(fill) = &self.fill {
            write!(f, " fill=\"{}\"", Escaped(&fill.to_string()))?;
        }
        if let Some(stroke) = &self.stroke {
            write!(f, " stroke=\"{}\"", Escaped(&stroke.to_string()))?;
        }
        if let Some(width) = self.stroke_width {
            write!(f, " stroke-width=\"{width}\"")?;
        }
        if let Some(cap) = self.line_cap {
            write!(f, " stroke-linecap=\"{cap}\"")?;
        }
        if let Some(join) = self.line_join {
            write!(f, " stroke-linejoin=\"{join}\"")?;
        }
        write!(f, ">{}</text>\n", Escaped(&self.content))
    }
}

/// One drawable primitive of the map.
#[derive(Debug, Clone)]
pub enum Shape {
    Circle(Circle),
    Polyline(Polyline),
    Text(Text),
}

impl From<Circle> for Shape {
    fn from(circle: Circle) -> Self {
        Shape::Circle(circle)
    }
}

impl From<Polyline> for Shape {
    fn from(polyline: Polyline) -> Self {
        Shape::Polyline(polyline)
    }
}

impl From<Text> for Shape {
    fn from(text: Text) -> Self {
        Shape::Text(text)
    }
}

impl Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Circle(circle) => circle.fmt(f),
            Shape::Polyline(polyline) => polyline.fmt(f),
            Shape::Text(text) => text.fmt(f),
        }
    }
}

/// An SVG document; shapes are rendered in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Document {
    shapes: Vec<Shape>,
}

impl Document {
    pub fn add(&mut self, shape: impl Into<Shape>) {
        self.shapes.push(shape.into());
    }

    #[must_use]
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\n")?;
        f.write_str("<svg xmlns=\"http://www.w3.org/2000/svg\" version=\"1.1\">\n")?;
        for shape in &self.shapes {
            shape.fmt(f)?;
        }
        f.write_str("</svg>")
    }
}

/// Wrapper escaping the five XML character entities on display.
struct Escaped<'a>(&'a str);

impl Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for symbol in self.0.chars() {
            match symbol {
                '&' => f.write_str("&amp;")?,
                '"' => f.write_str("&quot;")?,
                '\'' => f.write_str("&apos;")?,
                '<' => f.write_str("&lt;")?,
                '>' => f.write_str("&gt;")?,
                _ => f.write_char(symbol)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors_render_in_css_form() {
        assert_eq!(Color::from("red").to_string(), "red");
        assert_eq!(Color::Rgb(255, 160, 0).to_string(), "rgb(255,160,0)");
        assert_eq!(
            Color::Rgba(255, 160, 0, 0.3).to_string(),
            "rgba(255,160,0,0.3)"
        );
    }

    #[test]
    fn text_content_is_escaped() {
        let text = Text::default()
            .font_size(12)
            .content("M&M's <best> \"stop\"");

        let rendered = text.to_string();
        assert!(rendered.contains(">M&amp;M&apos;s &lt;best&gt; &quot;stop&quot;</text>"));
    }

    #[test]
    fn document_wraps_shapes_in_svg_markup() {
        let mut document = Document::default();
        document.add(
            Circle::default()
                .center(Point { x: 20.0, y: 21.0 })
                .radius(5.0)
                .fill("white"),
        );

        let rendered = document.render();
        assert!(rendered.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\n<svg"));
        assert!(rendered.contains("<circle cx=\"20\" cy=\"21\" r=\"5\" fill=\"white\"/>"));
        assert!(rendered.ends_with("</svg>"));
    }
}
