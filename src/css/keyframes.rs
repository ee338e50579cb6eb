//! Keyframe synthesis for one animation
//!
//! A timeline goes through fixed stages, each a distinct type so a later
//! stage can only be reached from the one before it:
//!
//! ```text
//! Keyframes<Raw> -> Keyframes<Deduped> -> Keyframes<EpsExpanded> -> Keyframes<LoopClosed> -> FormattedKeyframes
//! ```

use std::collections::VecDeque;
use std::marker::PhantomData;

use crate::animation::Animation;
use crate::parser::model::{ColorTransform, Matrix};

use super::format::{matrix3d, opacity_decl};

/// One keyframe: a pose at a percentage of the loop
#[derive(Debug, Clone, PartialEq)]
pub struct Keyframe {
    pub percent: f64,
    pub matrix: Matrix,
    pub ctf: Option<ColorTransform>,
    pub visible: bool,
}

impl Keyframe {
    /// 0 when hidden, else the alpha an opaque pixel keeps after the color transform
    pub fn opacity(&self) -> f64 {
        if !self.visible {
            return 0.0;
        }
        self.ctf.as_ref().map_or(1.0, ColorTransform::opacity)
    }

    /// Same matrix and opacity; percent is not compared
    pub fn same_pose(&self, other: &Keyframe) -> bool {
        self.matrix == other.matrix && self.opacity() == other.opacity()
    }

    fn at(&self, percent: f64) -> Keyframe {
        Keyframe {
            percent,
            ..self.clone()
        }
    }
}

/// Keyframes straight from the timeline
#[derive(Debug)]
pub struct Raw;
/// Runs of identical poses collapsed
#[derive(Debug)]
pub struct Deduped;
/// Visibility cuts doubled
#[derive(Debug)]
pub struct EpsExpanded;
/// Final 100% keyframe appended
#[derive(Debug)]
pub struct LoopClosed;

/// Keyframes at one synthesis stage
#[derive(Debug)]
pub struct Keyframes<S> {
    frames: Vec<Keyframe>,
    _stage: PhantomData<S>,
}

impl<S> Keyframes<S> {
    fn next<T>(frames: Vec<Keyframe>) -> Keyframes<T> {
        Keyframes {
            frames,
            _stage: PhantomData,
        }
    }

    pub fn frames(&self) -> &[Keyframe] {
        &self.frames
    }
}

impl Keyframes<Raw> {
    /// Frame `i` of `n` sits at `100 * i / n` percent
    pub fn from_animation(animation: &Animation) -> Self {
        let n = animation.frames.len() as f64;
        let frames = animation
            .frames
            .iter()
            .enumerate()
            .map(|(i, f)| Keyframe {
                percent: (i as f64 * 100.0) / n,
                matrix: f.matrix,
                ctf: f.ctf,
                visible: f.visible,
            })
            .collect();
        Self::from_keyframes(frames)
    }

    pub fn from_keyframes(frames: Vec<Keyframe>) -> Self {
        Keyframes {
            frames,
            _stage: PhantomData,
        }
    }

    /// Collapse runs of three or more equal poses to their first and last
    ///
    /// A single pass with a three-frame window: when all three match, the
    /// middle one is dropped, otherwise the oldest is emitted.
    pub fn dedup(self) -> Keyframes<Deduped> {
        let mut window: VecDeque<Keyframe> = VecDeque::with_capacity(3);
        let mut result = Vec::with_capacity(self.frames.len());

        for frame in self.frames {
            window.push_back(frame);
            if window.len() == 3 {
                if window[0].same_pose(&window[1]) && window[0].same_pose(&window[2]) {
                    window.remove(1);
                } else if let Some(oldest) = window.pop_front() {
                    result.push(oldest);
                }
            }
        }
        result.extend(window);
        Self::next(result)
    }
}

impl Keyframes<Deduped> {
    /// Insert a keyframe `eps` before every visibility change
    ///
    /// The inserted frame holds the state before the cut, so interpolation
    /// only runs over `eps` percent: a disappearing instance keeps its previous
    /// pose, an appearing one takes its new pose while still hidden.
    pub fn expand_visibility(self, eps: f64) -> Keyframes<EpsExpanded> {
        let mut result = Vec::with_capacity(self.frames.len() * 2);
        let mut previous: Option<Keyframe> = None;

        for frame in self.frames {
            if let Some(prev) = &previous {
                if !prev.visible && frame.visible {
                    let mut hidden = frame.at(frame.percent - eps);
                    hidden.visible = false;
                    result.push(hidden);
                } else if prev.visible && !frame.visible {
                    result.push(prev.at(frame.percent - eps));
                }
            }
            result.push(frame.clone());
            previous = Some(frame);
        }
        Self::next(result)
    }
}

impl Keyframes<EpsExpanded> {
    /// Repeat the first keyframe at 100% so the loop is seamless
    pub fn close_loop(mut self) -> Keyframes<LoopClosed> {
        if let Some(first) = self.frames.first() {
            let last = first.at(100.0);
            self.frames.push(last);
        }
        Self::next(self.frames)
    }
}

impl Keyframes<LoopClosed> {
    pub fn format(self) -> FormattedKeyframes {
        let lines = self
            .frames
            .iter()
            .map(|f| {
                format!(
                    "{:.6}% {{ -webkit-transform: {}; {} }}",
                    f.percent,
                    matrix3d(&f.matrix),
                    opacity_decl(f.opacity())
                )
            })
            .collect();
        FormattedKeyframes { lines }
    }
}

/// Keyframe lines ready to be wrapped in an `@-webkit-keyframes` block
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedKeyframes {
    lines: Vec<String>,
}

impl FormattedKeyframes {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn block(&self, name: &str) -> String {
        format!(
            "@-webkit-keyframes {} {{\n{}\n}}",
            name,
            self.lines.join("\n")
        )
    }
}

/// Run every stage for one animation
pub fn synthesize(animation: &Animation, eps: f64) -> FormattedKeyframes {
    Keyframes::from_animation(animation)
        .dedup()
        .expand_visibility(eps)
        .close_loop()
        .format()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::AnimFrame;
    use pretty_assertions::assert_eq;

    fn kf(percent: f64, tx: f64, visible: bool) -> Keyframe {
        Keyframe {
            percent,
            matrix: Matrix {
                tx,
                ..Matrix::IDENTITY
            },
            ctf: None,
            visible,
        }
    }

    fn summary<S>(k: &Keyframes<S>) -> Vec<(f64, f64, bool)> {
        k.frames()
            .iter()
            .map(|f| (f.percent, f.matrix.tx, f.visible))
            .collect()
    }

    #[test]
    fn test_dedup_collapses_runs() {
        let a = 0.0;
        let b = 20.0;
        let raw = Keyframes::from_keyframes(vec![
            kf(0.0, a, true),
            kf(10.0, a, true),
            kf(20.0, a, true),
            kf(30.0, a, true),
            kf(40.0, a, true),
            kf(50.0, a, true),
            kf(60.0, b, true),
            kf(70.0, a, true),
        ]);
        assert_eq!(
            summary(&raw.dedup()),
            vec![
                (0.0, a, true),
                (50.0, a, true),
                (60.0, b, true),
                (70.0, a, true)
            ]
        );
    }

    #[test]
    fn test_dedup_compares_opacity() {
        let mut faded = kf(10.0, 0.0, true);
        faded.ctf = Some(ColorTransform::from_values([256, 256, 256, 128, 0, 0, 0, 0]));
        let raw = Keyframes::from_keyframes(vec![kf(0.0, 0.0, true), faded, kf(20.0, 0.0, true)]);
        assert_eq!(raw.dedup().frames().len(), 3);
    }

    #[test]
    fn test_visibility_expansion_and_loop() {
        let raw = Keyframes::from_keyframes(vec![
            kf(0.0, 1.0, true),
            kf(50.0, 2.0, false),
            kf(60.0, 2.0, false),
            kf(70.0, 3.0, true),
        ]);
        let closed = raw.dedup().expand_visibility(0.1).close_loop();
        assert_eq!(
            summary(&closed),
            vec![
                (0.0, 1.0, true),
                (50.0 - 0.1, 1.0, true),
                (50.0, 2.0, false),
                (60.0, 2.0, false),
                (70.0 - 0.1, 3.0, false),
                (70.0, 3.0, true),
                (100.0, 1.0, true),
            ]
        );
    }

    #[test]
    fn test_empty_timeline_stays_empty() {
        let out = Keyframes::from_keyframes(vec![])
            .dedup()
            .expand_visibility(0.1)
            .close_loop()
            .format();
        assert!(out.lines().is_empty());
    }

    #[test]
    fn test_synthesize_regression() {
        let hidden = Matrix {
            sx: 1.0,
            sy: 1.0,
            wx: 356.0,
            wy: -44.0,
            tx: 0.0,
            ty: 0.0,
        };
        let shown = Matrix {
            sx: 1.10000610352,
            sy: 1.19999694824,
            wx: 329.0,
            wy: -77.0,
            tx: 0.0,
            ty: 0.0,
        };
        let frame = |index, matrix, ctf, visible| AnimFrame {
            index,
            matrix,
            ctf,
            visible,
        };
        let animation = Animation {
            key: "-obj16-33".to_string(),
            frames: vec![
                frame(0, hidden, None, false),
                frame(1, hidden, None, false),
                frame(
                    14,
                    shown,
                    Some(ColorTransform::from_values([0, 1, 10, 256, 100, 300, 256, 0])),
                    true,
                ),
                frame(16, hidden, None, false),
            ],
        };

        let expected = "@-webkit-keyframes -obj16-33 {
0.000000% { -webkit-transform: matrix3d(1.0,356.0,0,0,-44.0,1.0,0,0,0,0,1,0,0.0,0.0,0,1); opacity: 0.0; }
25.000000% { -webkit-transform: matrix3d(1.0,356.0,0,0,-44.0,1.0,0,0,0,0,1,0,0.0,0.0,0,1); opacity: 0.0; }
49.999900% { -webkit-transform: matrix3d(1.100006,329.0,0,0,-77.0,1.199997,0,0,0,0,1,0,0.0,0.0,0,1); opacity: 0.0; }
50.000000% { -webkit-transform: matrix3d(1.100006,329.0,0,0,-77.0,1.199997,0,0,0,0,1,0,0.0,0.0,0,1); opacity: 1.0; }
74.999900% { -webkit-transform: matrix3d(1.100006,329.0,0,0,-77.0,1.199997,0,0,0,0,1,0,0.0,0.0,0,1); opacity: 1.0; }
75.000000% { -webkit-transform: matrix3d(1.0,356.0,0,0,-44.0,1.0,0,0,0,0,1,0,0.0,0.0,0,1); opacity: 0.0; }
100.000000% { -webkit-transform: matrix3d(1.0,356.0,0,0,-44.0,1.0,0,0,0,0,1,0,0.0,0.0,0,1); opacity: 0.0; }
}";
        assert_eq!(synthesize(&animation, 0.0001).block("-obj16-33"), expected);
    }
}
