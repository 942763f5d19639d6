//! G-code export serializer.
//!
//! Emits a plain motion program for a pen plotter: millimetres, absolute
//! coordinates, one pen-down stroke per path. The pen is driven either by
//! explicit Z moves (when the profile enables Z safety) or by the `M3` /
//! `M5` servo pair.
//!
//! Output is byte-exact for identical input: coordinates always use three
//! decimals and feed rates none.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use std::fmt::Write;

use penplot_pipeline::{PathSet, PlotProfile, PlotSpace, Point};

use crate::ExportError;

/// Serialize plot-space strokes into a G-code program.
///
/// Layout:
///
/// ```text
/// ; header comments           (include_header_comments)
/// G21
/// G90
/// G28                         (add_homing)
/// <pen up>
/// G0 X.. Y..                  per path: travel to the first point,
/// <pen down>                            lower the pen,
/// G1 X.. Y.. F<feed>                    cut to each further point,
/// G1 X.. Y..
/// <pen up>                              raise the pen
/// ; end                       (include_header_comments)
/// <pen up>
/// G28                         (add_homing)
/// M2
/// ```
///
/// An empty path set still produces the header, homing and trailer.
/// [`PlotProfile::validate`] keeps the feed rate and pen lift above the
/// smallest values these formats can print, so neither rounds to zero.
///
/// # Errors
///
/// Returns [`ExportError::Pipeline`] if `profile` fails validation.
pub fn to_gcode(paths: &PathSet<PlotSpace>, profile: &PlotProfile) -> Result<String, ExportError> {
    profile.validate()?;

    let pen = Pen::for_profile(profile);
    let mut out = String::new();

    if profile.include_header_comments {
        write_header(&mut out, paths, profile);
    }

    let _ = writeln!(out, "G21");
    let _ = writeln!(out, "G90");
    if profile.add_homing {
        let _ = writeln!(out, "G28");
    }
    pen.up(&mut out);

    for path in paths {
        let points = path.points();
        let Some((first, rest)) = points.split_first() else {
            continue;
        };
        let _ = writeln!(out, "G0 {}", xy(*first));
        pen.down(&mut out);
        for (i, p) in rest.iter().enumerate() {
            if i == 0 {
                let _ = writeln!(out, "G1 {} F{:.0}", xy(*p), profile.feed_rate);
            } else {
                let _ = writeln!(out, "G1 {}", xy(*p));
            }
        }
        pen.up(&mut out);
    }

    if profile.include_header_comments {
        let _ = writeln!(out, "; end");
    }
    pen.up(&mut out);
    if profile.add_homing {
        let _ = writeln!(out, "G28");
    }
    let _ = writeln!(out, "M2");

    tracing::debug!(paths = paths.len(), bytes = out.len(), "wrote G-code");
    Ok(out)
}

/// How the pen is raised and lowered.
enum Pen {
    /// Explicit Z moves.
    Z { lift: f64, feed: f64 },
    /// Servo on `M3` (down) / `M5` (up).
    Servo,
}

impl Pen {
    const fn for_profile(profile: &PlotProfile) -> Self {
        if profile.z_safety {
            Self::Z {
                lift: profile.pen_lift,
                feed: profile.feed_rate,
            }
        } else {
            Self::Servo
        }
    }

    fn up(&self, out: &mut String) {
        let _ = match self {
            Self::Z { lift, .. } => writeln!(out, "G0 Z{}", coord(*lift)),
            Self::Servo => writeln!(out, "M5"),
        };
    }

    fn down(&self, out: &mut String) {
        let _ = match self {
            Self::Z { feed, .. } => writeln!(out, "G1 Z0 F{feed:.0}"),
            Self::Servo => writeln!(out, "M3"),
        };
    }
}

fn write_header(out: &mut String, paths: &PathSet<PlotSpace>, profile: &PlotProfile) {
    let _ = writeln!(out, "; penplot G-code");
    let _ = writeln!(
        out,
        "; bed: {} x {} mm",
        coord(profile.bed_width),
        coord(profile.bed_height)
    );
    let _ = writeln!(out, "; feed rate: {:.0} mm/min", profile.feed_rate);
    if profile.z_safety {
        let _ = writeln!(out, "; pen lift: {} mm", coord(profile.pen_lift));
    } else {
        let _ = writeln!(out, "; pen: servo M3/M5");
    }
    let _ = writeln!(
        out,
        "; paths: {}, points: {}",
        paths.len(),
        paths.point_count()
    );
}

fn xy(p: Point) -> String {
    format!("X{} Y{}", coord(p.x), coord(p.y))
}

/// Three decimals, never `-0.000`.
fn coord(v: f64) -> String {
    let rounded = (v * 1000.0).round() / 1000.0 + 0.0;
    format!("{rounded:.3}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use penplot_pipeline::Polyline;

    use super::*;

    fn set(paths: Vec<Vec<(f64, f64)>>) -> PathSet<PlotSpace> {
        PathSet::new(
            paths
                .into_iter()
                .map(|pts| Polyline::new(pts.into_iter().map(|(x, y)| Point::new(x, y)).collect()))
                .collect(),
        )
    }

    fn lines(gcode: &str) -> Vec<&str> {
        gcode.lines().collect()
    }

    #[test]
    fn empty_set_has_header_homing_and_trailer_only() {
        let gcode = to_gcode(&PathSet::empty(), &PlotProfile::default()).unwrap();
        assert!(gcode.starts_with("; penplot G-code\n"));
        assert_eq!(gcode.lines().filter(|l| l.contains(" X")).count(), 0);
        assert_eq!(gcode.lines().filter(|l| *l == "G28").count(), 2);
        assert!(gcode.ends_with("M2\n"));
    }

    #[test]
    fn empty_set_without_options_is_still_a_program() {
        let profile = PlotProfile {
            include_header_comments: false,
            add_homing: false,
            z_safety: false,
            ..PlotProfile::default()
        };
        let gcode = to_gcode(&PathSet::empty(), &profile).unwrap();
        assert_eq!(lines(&gcode), ["G21", "G90", "M5", "M5", "M2"]);
    }

    #[test]
    fn z_safety_program_is_exact() {
        let profile = PlotProfile {
            include_header_comments: false,
            ..PlotProfile::default()
        };
        let gcode = to_gcode(
            &set(vec![vec![(1.0, 2.0), (3.5, 4.25), (10.0, 2.0)]]),
            &profile,
        )
        .unwrap();
        assert_eq!(
            lines(&gcode),
            [
                "G21",
                "G90",
                "G28",
                "G0 Z5.000",
                "G0 X1.000 Y2.000",
                "G1 Z0 F1000",
                "G1 X3.500 Y4.250 F1000",
                "G1 X10.000 Y2.000",
                "G0 Z5.000",
                "G0 Z5.000",
                "G28",
                "M2",
            ]
        );
    }

    #[test]
    fn servo_mode_uses_m3_m5() {
        let profile = PlotProfile {
            include_header_comments: false,
            add_homing: false,
            z_safety: false,
            ..PlotProfile::default()
        };
        let gcode = to_gcode(&set(vec![vec![(0.0, 0.0), (1.0, 1.0)]]), &profile).unwrap();
        assert_eq!(
            lines(&gcode),
            [
                "G21",
                "G90",
                "M5",
                "G0 X0.000 Y0.000",
                "M3",
                "G1 X1.000 Y1.000 F1000",
                "M5",
                "M5",
                "M2",
            ]
        );
        assert!(!gcode.contains('Z'));
    }

    #[test]
    fn pen_lifts_before_every_travel() {
        let gcode = to_gcode(
            &set(vec![
                vec![(0.0, 0.0), (1.0, 0.0)],
                vec![(5.0, 5.0), (6.0, 5.0)],
            ]),
            &PlotProfile::default(),
        )
        .unwrap();
        let ls = lines(&gcode);
        for (i, l) in ls.iter().enumerate() {
            if l.starts_with("G0 X") {
                assert_eq!(ls[i - 1], "G0 Z5.000", "travel at line {i} without pen up");
            }
        }
    }

    #[test]
    fn single_point_path_is_a_dot() {
        let profile = PlotProfile {
            include_header_comments: false,
            add_homing: false,
            ..PlotProfile::default()
        };
        let gcode = to_gcode(&set(vec![vec![(2.0, 3.0)]]), &profile).unwrap();
        assert!(gcode.contains("G0 X2.000 Y3.000\nG1 Z0 F1000\nG0 Z5.000\n"));
    }

    #[test]
    fn header_describes_profile_and_counts() {
        let gcode = to_gcode(
            &set(vec![vec![(0.0, 0.0), (1.0, 0.0)], vec![(2.0, 2.0)]]),
            &PlotProfile::default(),
        )
        .unwrap();
        assert!(gcode.contains("; bed: 100.000 x 100.000 mm\n"));
        assert!(gcode.contains("; feed rate: 1000 mm/min\n"));
        assert!(gcode.contains("; pen lift: 5.000 mm\n"));
        assert!(gcode.contains("; paths: 2, points: 3\n"));
    }

    #[test]
    fn output_is_deterministic() {
        let paths = set(vec![vec![(0.1234, 9.8765), (3.0, 4.0)]]);
        let a = to_gcode(&paths, &PlotProfile::default()).unwrap();
        let b = to_gcode(&paths, &PlotProfile::default()).unwrap();
        assert_eq!(a, b);
        assert!(a.contains("G0 X0.123 Y9.877"));
    }

    #[test]
    fn negative_zero_never_printed() {
        assert_eq!(coord(-0.0001), "0.000");
        assert_eq!(coord(-0.0), "0.000");
    }

    #[test]
    fn end_comment_follows_header_setting() {
        let paths = set(vec![vec![(0.0, 0.0), (1.0, 1.0)]]);
        let with = to_gcode(&paths, &PlotProfile::default()).unwrap();
        assert!(with.lines().any(|l| l == "; end"));

        let profile = PlotProfile {
            include_header_comments: false,
            ..PlotProfile::default()
        };
        let without = to_gcode(&paths, &profile).unwrap();
        assert!(!without.contains(';'));
    }

    #[test]
    fn smallest_feed_and_lift_never_print_as_zero() {
        let profile = PlotProfile {
            feed_rate: PlotProfile::MIN_FEED_RATE,
            pen_lift: PlotProfile::MIN_PEN_LIFT,
            include_header_comments: false,
            add_homing: false,
            ..PlotProfile::default()
        };
        let gcode = to_gcode(&set(vec![vec![(0.0, 0.0), (1.0, 1.0)]]), &profile).unwrap();
        assert!(gcode.contains("G0 Z0.001\n"));
        assert!(gcode.contains("G1 Z0 F1\n"));
        assert!(gcode.contains("G1 X1.000 Y1.000 F1\n"));
        assert!(!gcode.contains("F0"));
    }

    #[test]
    fn feed_and_lift_that_would_round_to_zero_are_rejected() {
        for profile in [
            PlotProfile {
                feed_rate: 0.4,
                ..PlotProfile::default()
            },
            PlotProfile {
                pen_lift: 0.0004,
                ..PlotProfile::default()
            },
        ] {
            let err = to_gcode(&set(vec![vec![(0.0, 0.0), (1.0, 1.0)]]), &profile).unwrap_err();
            assert!(matches!(err, ExportError::Pipeline(_)));
        }
    }

    #[test]
    fn invalid_profile_rejected() {
        let profile = PlotProfile {
            pen_lift: 0.0,
            ..PlotProfile::default()
        };
        let err = to_gcode(&PathSet::empty(), &profile).unwrap_err();
        assert!(matches!(err, ExportError::Pipeline(_)));
    }
}
