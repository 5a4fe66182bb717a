use crate::colors::{UNCATEGORIZED_RGB, USER_MARKER_RGB, category_color};
use crate::geo::Coordinate;
use crate::problem::{CategoryIndex, Problem};
use crate::viewport::Viewport;

/// Screen radius (CSS px) within which a click selects a pin.
pub const MARKER_HIT_RADIUS: f64 = 14.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKey {
    User,
    Problem(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Popup {
    pub title: String,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub key: MarkerKey,
    pub coordinate: Coordinate,
    pub color: (u8, u8, u8),
    pub popup: Popup,
}

pub fn user_marker(coordinate: Coordinate, used_fallback: bool) -> Marker {
    let title = if used_fallback {
        "Default location"
    } else {
        "You are here"
    };
    Marker {
        key: MarkerKey::User,
        coordinate,
        color: USER_MARKER_RGB,
        popup: Popup {
            title: title.to_string(),
            lines: vec![format!(
                "{:.5}, {:.5}",
                coordinate.latitude, coordinate.longitude
            )],
        },
    }
}

/// Problem pins, one per problem that carries both coordinates, in input order.
pub fn problem_markers(problems: &[Problem], categories: &CategoryIndex) -> Vec<Marker> {
    problems
        .iter()
        .filter_map(|problem| {
            let coordinate = problem.coordinate()?;
            let category = categories.label(problem.category_id);
            let color = match (problem.category_id, category) {
                (Some(id), Some(_)) => category_color(id),
                _ => UNCATEGORIZED_RGB,
            };
            Some(Marker {
                key: MarkerKey::Problem(problem.id),
                coordinate,
                color,
                popup: problem_popup(problem, category),
            })
        })
        .collect()
}

fn problem_popup(problem: &Problem, category: Option<&str>) -> Popup {
    let title = category
        .map(str::to_string)
        .unwrap_or_else(|| format!("Problem #{}", problem.id));

    let mut lines = Vec::with_capacity(4);
    if !problem.description.trim().is_empty() {
        lines.push(problem.description.trim().to_string());
    }
    if problem.status_id.is_some() {
        lines.push(format!("Status: {}", problem.status().label()));
    }
    if let Some(address) = problem.address.as_deref().filter(|a| !a.trim().is_empty()) {
        lines.push(address.trim().to_string());
    }
    match (problem.protocol.as_deref(), problem.created_at_utc()) {
        (Some(protocol), Some(created)) => {
            lines.push(format!("#{protocol} · {}", created.format("%d/%m/%Y")));
        }
        (Some(protocol), None) => lines.push(format!("#{protocol}")),
        (None, Some(created)) => lines.push(created.format("%d/%m/%Y").to_string()),
        (None, None) => {}
    }

    Popup { title, lines }
}

/// The pins currently on a map: one user pin plus the problem pins.
///
/// Problem pins are always replaced wholesale, so the layer never carries
/// stale pins from an older problem list.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerLayer {
    user: Marker,
    problems: Vec<Marker>,
}

impl MarkerLayer {
    pub fn new(user: Marker) -> Self {
        Self {
            user,
            problems: Vec::new(),
        }
    }

    pub fn sync(&mut self, problems: &[Problem], categories: &CategoryIndex) {
        self.problems = problem_markers(problems, categories);
    }

    pub fn user(&self) -> &Marker {
        &self.user
    }

    pub fn problems(&self) -> &[Marker] {
        &self.problems
    }

    pub fn len(&self) -> usize {
        self.problems.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// All pins, user pin last so it paints on top.
    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.problems.iter().chain(std::iter::once(&self.user))
    }

    pub fn get(&self, key: MarkerKey) -> Option<&Marker> {
        self.iter().find(|marker| marker.key == key)
    }

    /// The topmost pin whose anchor lies within the hit radius of a screen point.
    pub fn hit_test(&self, vp: &Viewport, sx: f64, sy: f64) -> Option<MarkerKey> {
        let mut best: Option<(f64, MarkerKey)> = None;
        for marker in self.iter() {
            let (mx, my) = vp.coordinate_to_screen(marker.coordinate);
            // Pins are drawn above their anchor; bias the hit circle upward.
            let dx = sx - mx;
            let dy = sy - (my - MARKER_HIT_RADIUS * 0.8);
            let dist_sq = dx * dx + dy * dy;
            if dist_sq > MARKER_HIT_RADIUS * MARKER_HIT_RADIUS {
                continue;
            }
            if best.is_none_or(|(d, _)| dist_sq <= d) {
                best = Some((dist_sq, marker.key));
            }
        }
        best.map(|(_, key)| key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::FALLBACK_COORDINATE;
    use crate::problem::Category;

    fn problem(id: i64, lat: Option<f64>, lon: Option<f64>) -> Problem {
        Problem {
            id,
            latitude: lat,
            longitude: lon,
            description: format!("problem {id}"),
            category_id: Some(1),
            protocol: None,
            status_id: None,
            address: None,
            created_at: None,
        }
    }

    fn categories() -> CategoryIndex {
        CategoryIndex::build(&[Category {
            id: 1,
            name: "Iluminação".into(),
            description: None,
        }])
    }

    fn layer() -> MarkerLayer {
        MarkerLayer::new(user_marker(FALLBACK_COORDINATE, true))
    }

    #[test]
    fn marker_count_is_eligible_problems_plus_user() {
        let problems = vec![
            problem(1, Some(-29.1), Some(-51.1)),
            problem(2, Some(-29.2), Some(-51.2)),
            problem(3, Some(-29.3), Some(-51.3)),
        ];
        let mut layer = layer();
        layer.sync(&problems, &categories());
        assert_eq!(layer.len(), 4);
        assert_eq!(layer.iter().count(), 4);
    }

    #[test]
    fn problems_without_coordinates_get_no_marker() {
        let problems = vec![
            problem(1, Some(-29.1), Some(-51.1)),
            problem(2, None, Some(-51.2)),
            problem(3, Some(-29.3), None),
            problem(4, None, None),
        ];
        let markers = problem_markers(&problems, &categories());
        let keys: Vec<_> = markers.iter().map(|m| m.key).collect();
        assert_eq!(keys, vec![MarkerKey::Problem(1)]);
    }

    #[test]
    fn resync_replaces_problem_markers_and_keeps_user() {
        let mut layer = layer();
        layer.sync(
            &[
                problem(1, Some(-29.1), Some(-51.1)),
                problem(2, Some(-29.2), Some(-51.2)),
            ],
            &categories(),
        );
        let user_before = layer.user().clone();

        layer.sync(
            &[
                problem(2, Some(-29.2), Some(-51.2)),
                problem(5, Some(-29.5), Some(-51.5)),
                problem(6, None, None),
            ],
            &categories(),
        );

        let keys: Vec<_> = layer.problems().iter().map(|m| m.key).collect();
        assert_eq!(keys, vec![MarkerKey::Problem(2), MarkerKey::Problem(5)]);
        assert_eq!(layer.user(), &user_before);
        assert!(layer.get(MarkerKey::Problem(1)).is_none());
    }

    #[test]
    fn popup_uses_category_label_and_details() {
        let mut p = problem(9, Some(-29.0), Some(-51.0));
        p.status_id = Some(3);
        p.address = Some(" Rua Pinheiro Machado ".into());
        p.protocol = Some("2025-00009".into());
        p.created_at = Some("2025-03-01T12:30:00".into());
        let markers = problem_markers(&[p], &categories());
        let popup = &markers[0].popup;
        assert_eq!(popup.title, "Iluminação");
        assert_eq!(
            popup.lines,
            vec![
                "problem 9".to_string(),
                "Status: In progress".to_string(),
                "Rua Pinheiro Machado".to_string(),
                "#2025-00009 · 01/03/2025".to_string(),
            ]
        );
    }

    #[test]
    fn unknown_category_falls_back_to_id_title() {
        let mut p = problem(4, Some(0.0), Some(0.0));
        p.category_id = Some(99);
        let markers = problem_markers(&[p], &categories());
        assert_eq!(markers[0].popup.title, "Problem #4");
        assert_eq!(markers[0].color, UNCATEGORIZED_RGB);
    }

    #[test]
    fn user_marker_title_reflects_fallback() {
        assert_eq!(
            user_marker(FALLBACK_COORDINATE, true).popup.title,
            "Default location"
        );
        assert_eq!(
            user_marker(FALLBACK_COORDINATE, false).popup.title,
            "You are here"
        );
    }

    #[test]
    fn hit_test_finds_pin_above_anchor() {
        let vp = Viewport::centered(FALLBACK_COORDINATE, 15.0, 800.0, 600.0);
        let layer = layer();
        let (ux, uy) = vp.coordinate_to_screen(FALLBACK_COORDINATE);
        assert_eq!(
            layer.hit_test(&vp, ux, uy - MARKER_HIT_RADIUS * 0.8),
            Some(MarkerKey::User)
        );
        assert_eq!(layer.hit_test(&vp, ux + 100.0, uy + 100.0), None);
    }
}
