/*!
Renders the network as an SVG document.

Stops served by at least one bus are projected onto the canvas; the map is
drawn in four layers, each sorted by name: bus polylines, bus name labels,
stop circles and stop name labels.
*/

use geo::Point;
use serde::{Deserialize, Serialize};

use crate::catalogue::{Bus, Catalogue, Stop, StopId};
use crate::svg;
use crate::svg::{Color, StrokeLineCap, StrokeLineJoin};

const EPSILON: f64 = 1e-6;

/// Canvas geometry, typography and palette of the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSettings {
    pub width: f64,
    pub height: f64,
    pub padding: f64,
    pub line_width: f64,
    pub stop_radius: f64,
    pub bus_label_font_size: u32,
    pub bus_label_offset: (f64, f64),
    pub stop_label_font_size: u32,
    pub stop_label_offset: (f64, f64),
    pub underlayer_color: Color,
    pub underlayer_width: f64,
    pub color_palette: Vec<Color>,
}

/// Maps geographic coordinates onto the canvas, keeping the aspect of the
/// denser axis and flipping latitude so north points up.
#[derive(Debug, Clone, Copy)]
struct Projector {
    padding: f64,
    min_lng: f64,
    max_lat: f64,
    zoom: f64,
}

impl Projector {
    fn new<I>(locations: I, width: f64, height: f64, padding: f64) -> Self
    where
        I: IntoIterator<Item = Point<f64>>,
    {
        let mut min_lng = f64::INFINITY;
        let mut max_lng = f64::NEG_INFINITY;
        let mut min_lat = f64::INFINITY;
        let mut max_lat = f64::NEG_INFINITY;
        for location in locations {
            min_lng = min_lng.min(location.x());
            max_lng = max_lng.max(location.x());
            min_lat = min_lat.min(location.y());
            max_lat = max_lat.max(location.y());
        }

        if !min_lng.is_finite() {
            return Self {
                padding,
                min_lng: 0.0,
                max_lat: 0.0,
                zoom: 0.0,
            };
        }

        let width_zoom =
            (max_lng - min_lng > EPSILON).then(|| (width - 2.0 * padding) / (max_lng - min_lng));
        let height_zoom =
            (max_lat - min_lat > EPSILON).then(|| (height - 2.0 * padding) / (max_lat - min_lat));

        let zoom = match (width_zoom, height_zoom) {
            (Some(by_width), Some(by_height)) => by_width.min(by_height),
            (Some(by_width), None) => by_width,
            (None, Some(by_height)) => by_height,
            (None, None) => 0.0,
        };

        Self {
            padding,
            min_lng,
            max_lat,
            zoom,
        }
    }

    fn project(&self, location: Point<f64>) -> svg::Point {
        svg::Point {
            x: (location.x() - self.min_lng) * self.zoom + self.padding,
            y: (self.max_lat - location.y()) * self.zoom + self.padding,
        }
    }
}

pub struct MapRenderer<'a> {
    catalogue: &'a Catalogue,
    settings: &'a RenderSettings,
}

impl<'a> MapRenderer<'a> {
    #[must_use]
    pub fn new(catalogue: &'a Catalogue, settings: &'a RenderSettings) -> Self {
        Self {
            catalogue,
            settings,
        }
    }

    /// Draws the whole network and returns the SVG document text.
    #[must_use]
    pub fn render(&self) -> String {
        let served_stops = self.served_stops();
        let projector = Projector::new(
            served_stops.iter().map(|stop| stop.location),
            self.settings.width,
            self.settings.height,
            self.settings.padding,
        );

        let mut buses: Vec<&Bus> = self
            .catalogue
            .buses()
            .iter()
            .filter(|bus| !bus.route.is_empty())
            .collect();
        buses.sort_unstable_by(|left, right| left.name.cmp(&right.name));

        let mut document = svg::Document::default();
        self.draw_route_lines(&mut document, &buses, &projector);
        self.draw_bus_labels(&mut document, &buses, &projector);
        self.draw_stop_circles(&mut document, &served_stops, &projector);
        self.draw_stop_labels(&mut document, &served_stops, &projector);

        document.render()
    }

    /// Stops with at least one bus, sorted by name.
    fn served_stops(&self) -> Vec<&Stop> {
        let mut stops: Vec<&Stop> = self
            .catalogue
            .stops()
            .iter()
            .enumerate()
            .filter(|(index, _)| self.catalogue.stop_served(StopId(*index as u32)))
            .map(|(_, stop)| stop)
            .collect();
        stops.sort_unstable_by(|left, right| left.name.cmp(&right.name));
        stops
    }

    fn palette_color(&self, index: usize) -> Option<Color> {
        let palette = &self.settings.color_palette;
        (!palette.is_empty()).then(|| palette[index % palette.len()].clone())
    }

    fn draw_route_lines(&self, document: &mut svg::Document, buses: &[&Bus], projector: &Projector) {
        for (index, bus) in buses.iter().enumerate() {
            let mut line = svg::Polyline::default()
                .fill("none")
                .stroke_width(self.settings.line_width)
                .line_cap(StrokeLineCap::Round)
                .line_join(StrokeLineJoin::Round);
            if let Some(color) = self.palette_color(index) {
                line = line.stroke(color);
            }
            for &stop in &bus.route {
                line = line.point(projector.project(self.catalogue.stop(stop).location));
            }
            document.add(line);
        }
    }

    fn draw_bus_labels(&self, document: &mut svg::Document, buses: &[&Bus], projector: &Projector) {
        for (index, bus) in buses.iter().enumerate() {
            let first = bus.route[0];
            let position = projector.project(self.catalogue.stop(first).location);
            document.add(self.bus_underlabel(position, &bus.name));
            document.add(self.bus_label(position, &bus.name, index));

            if !bus.is_roundtrip {
                let middle = bus.route[bus.route.len() / 2];
                let position = projector.project(self.catalogue.stop(middle).location);
                document.add(self.bus_underlabel(position, &bus.name));
                document.add(self.bus_label(position, &bus.name, index));
            }
        }
    }

    fn draw_stop_circles(
        &self,
        document: &mut svg::Document,
        stops: &[&Stop],
        projector: &Projector,
    ) {
        for stop in stops {
            document.add(
                svg::Circle::default()
                    .center(projector.project(stop.location))
                    .radius(self.settings.stop_radius)
                    .fill("white"),
            );
        }
    }

    fn draw_stop_labels(
        &self,
        document: &mut svg::Document,
        stops: &[&Stop],
        projector: &Projector,
    ) {
        let (dx, dy) = self.settings.stop_label_offset;
        for stop in stops {
            let base = svg::Text::default()
                .position(projector.project(stop.location))
                .offset(svg::Point { x: dx, y: dy })
                .font_size(self.settings.stop_label_font_size)
                .font_family("Verdana")
                .content(&stop.name);
            document.add(
                base.clone()
                    .fill(self.settings.underlayer_color.clone())
                    .stroke(self.settings.underlayer_color.clone())
                    .stroke_width(self.settings.underlayer_width)
                    .line_cap(StrokeLineCap::Round)
                    .line_join(StrokeLineJoin::Round),
            );
            document.add(base.fill("black"));
        }
    }

    fn bus_text(&self, position: svg::Point, name: &str) -> svg::Text {
        let (dx, dy) = self.settings.bus_label_offset;
        svg::Text::default()
            .position(position)
            .offset(svg::Point { x: dx, y: dy })
            .font_size(self.settings.bus_label_font_size)
            .font_family("Verdana")
            .font_weight("bold")
            .content(name)
    }

    fn bus_label(&self, position: svg::Point, name: &str, index: usize) -> svg::Text {
        let mut label = self.bus_text(position, name);
        if let Some(color) = self.palette_color(index) {
            label = label.fill(color);
        }
        label
    }

    fn bus_underlabel(&self, position: svg::Point, name: &str) -> svg::Text {
        self.bus_text(position, name)
            .fill(self.settings.underlayer_color.clone())
            .stroke(self.settings.underlayer_color.clone())
            .stroke_width(self.settings.underlayer_width)
            .line_cap(StrokeLineCap::Round)
            .line_join(StrokeLineJoin::Round)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::Catalogue;

    fn settings() -> RenderSettings {
        RenderSettings {
            width: 600.0,
            height: 400.0,
            padding: 50.0,
            line_width: 14.0,
            stop_radius: 5.0,
            bus_label_font_size: 20,
            bus_label_offset: (7.0, 15.0),
            stop_label_font_size: 18,
            stop_label_offset: (7.0, -3.0),
            underlayer_color: Color::Rgba(255, 255, 255, 0.85),
            underlayer_width: 3.0,
            color_palette: vec![
                Color::from("green"),
                Color::Rgb(255, 160, 0),
                Color::from("red"),
            ],
        }
    }

    fn occurrences(haystack: &str, needle: &str) -> usize {
        haystack.matches(needle).count()
    }

    #[test]
    fn roundtrip_bus_map_layers() {
        let mut catalogue = Catalogue::default();
        let a = catalogue.add_stop("Universam", 55.611087, 37.208290).unwrap();
        let b = catalogue.add_stop("Prazhskaya", 55.595884, 37.209755).unwrap();
        catalogue.add_stop("Unserved", 55.580999, 37.659164).unwrap();
        catalogue.set_distance(a, b, 3900.0);
        catalogue.add_bus("256", vec![a, b, a], true).unwrap();

        let settings = settings();
        let rendered = MapRenderer::new(&catalogue, &settings).render();

        // One polyline, one bus label pair, a circle per served stop and a
        // label pair per served stop; the unserved stop stays invisible.
        assert_eq!(occurrences(&rendered, "<polyline"), 1);
        assert_eq!(occurrences(&rendered, "<circle"), 2);
        assert_eq!(occurrences(&rendered, ">256</text>"), 2);
        assert_eq!(occurrences(&rendered, "<text"), 6);
        assert_eq!(occurrences(&rendered, "Unserved"), 0);
        assert!(rendered.contains("fill=\"white\""));
        assert!(rendered.contains("stroke=\"green\""));
    }

    #[test]
    fn linear_bus_gets_a_second_label() {
        let mut catalogue = Catalogue::default();
        let a = catalogue.add_stop("Apteka", 55.611087, 37.208290).unwrap();
        let b = catalogue.add_stop("Biryulyovo", 55.595884, 37.209755).unwrap();
        catalogue.set_distance(a, b, 3900.0);
        catalogue.add_bus("750", vec![a, b], false).unwrap();

        let settings = settings();
        let rendered = MapRenderer::new(&catalogue, &settings).render();

        assert_eq!(occurrences(&rendered, ">750</text>"), 4);
    }

    #[test]
    fn stop_names_are_escaped() {
        let mut catalogue = Catalogue::default();
        let a = catalogue.add_stop("Tsar'kovo", 55.611087, 37.208290).unwrap();
        catalogue.set_distance(a, a, 100.0);
        catalogue.add_bus("1", vec![a, a], true).unwrap();

        let settings = settings();
        let rendered = MapRenderer::new(&catalogue, &settings).render();

        assert!(rendered.contains("Tsar&apos;kovo"));
    }

    #[test]
    fn single_stop_projects_into_the_padding_corner() {
        let projector = Projector::new(
            std::iter::once(Point::new(37.2, 55.6)),
            600.0,
            400.0,
            50.0,
        );

        let projected = projector.project(Point::new(37.2, 55.6));
        assert!(approx::abs_diff_eq!(projected.x, 50.0));
        assert!(approx::abs_diff_eq!(projected.y, 50.0));
    }
}
