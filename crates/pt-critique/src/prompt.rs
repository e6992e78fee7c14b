//! Instruction construction.
//!
//! [`build_instructions`] turns a difficulty and perspective mode into a
//! [`PromptSpec`]; the spec renders the system role and the per-request
//! instruction blocks. Nothing here touches the network.

use std::fmt::Write as _;

use pt_core::{Difficulty, EdgeSegment, Normalized, PerspectiveMode};

use crate::response::edges_to_json;

/// Voice of the written feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Lenient, warm, step-by-step
    Encouraging,
    Balanced,
    /// Strict, technical, brief
    Terse,
}

/// Words the model must avoid and the plain words to use instead
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    pub forbidden: Vec<&'static str>,
    pub preferred: Vec<&'static str>,
}

/// Which image an extraction request looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRole {
    Reference,
    Drawing,
}

impl ImageRole {
    fn describe(&self) -> &'static str {
        match self {
            ImageRole::Reference => "a clean computer render of a cube (the reference)",
            ImageRole::Drawing => "a student's hand drawing of a cube, possibly a photo of paper",
        }
    }
}

/// Everything that varies between prompts
#[derive(Debug, Clone, PartialEq)]
pub struct PromptSpec {
    pub difficulty: Difficulty,
    pub mode: PerspectiveMode,
    pub tone: Tone,
    /// Grading rubric with strictness for this difficulty
    pub rubric: String,
    /// Present only for lenient difficulties
    pub vocabulary: Option<Vocabulary>,
    /// Length and structure of the feedback text
    pub feedback_style: &'static str,
}

/// Weighted rubric criteria, summing to 100
pub const RUBRIC_WEIGHTS: [(&str, u32); 4] = [
    ("Line convergence: do the left and right line families head towards consistent vanishing points", 40),
    ("Vertical fidelity: are vertical edges vertical (or converging consistently in 3-point)", 25),
    ("Proportion: is the cube plausibly a cube, not a stretched box", 20),
    ("Line confidence: are the lines clean, single and deliberate", 15),
];

pub fn build_instructions(difficulty: Difficulty, mode: PerspectiveMode) -> PromptSpec {
    let (tone, strictness, feedback_style) = match difficulty {
        Difficulty::Beginner => (
            Tone::Encouraging,
            "Be lenient. Small wobbles and slightly off angles are fine. Give an A or B to any drawing whose line families clearly converge the right way.",
            "Start with one thing that went well. Then give at most three short, numbered steps to improve. Friendly, plain language, under 150 words.",
        ),
        Difficulty::Intermediate => (
            Tone::Balanced,
            "Be fair. Expect the line families to converge consistently; noticeable drift in one family costs a grade.",
            "Two short paragraphs: what works, then what to fix first. Under 200 words.",
        ),
        Difficulty::Advanced => (
            Tone::Terse,
            "Be strict. Reserve A for drawings whose every family converges to a single point and whose verticals are true. Any inconsistent family caps the grade at C.",
            "Bullet points only, technical and direct. Name the worst-converging family first. Under 120 words.",
        ),
    };

    let mut rubric = String::new();
    for (criterion, weight) in RUBRIC_WEIGHTS {
        let _ = writeln!(rubric, "- {criterion} ({weight}%)");
    }
    let _ = writeln!(rubric, "{strictness}");

    let vocabulary = (difficulty == Difficulty::Beginner).then(|| Vocabulary {
        forbidden: vec!["vector", "orthogonal", "cartesian", "vertex", "coordinate", "parallax"],
        preferred: vec!["slant", "angle", "flow", "lean", "corner", "meet"],
    });

    PromptSpec {
        difficulty,
        mode,
        tone,
        rubric,
        vocabulary,
        feedback_style,
    }
}

impl PromptSpec {
    /// System role shared by every request.
    pub fn system_instruction(&self) -> String {
        let mut text = String::from(
            "You are a geometry analyzer for perspective drawing practice. You are not an art critic: \
             ignore shading, style, line weight aesthetics and paper texture. You measure where straight \
             edges are and which direction they run.\n",
        );
        let _ = writeln!(text, "Tone: {}.", match self.tone {
            Tone::Encouraging => "warm and encouraging, like a patient teacher",
            Tone::Balanced => "constructive and matter-of-fact",
            Tone::Terse => "strict, technical and brief",
        });
        if let Some(vocabulary) = &self.vocabulary {
            let _ = writeln!(
                text,
                "Never use these words: {}. Prefer everyday words such as: {}.",
                vocabulary.forbidden.join(", "),
                vocabulary.preferred.join(", ")
            );
        }
        text.push_str("Always answer with a single JSON object and nothing else.");
        text
    }

    /// What the three edge classes mean in the current mode.
    pub fn axis_guide(&self) -> &'static str {
        match self.mode {
            PerspectiveMode::OnePoint => {
                "This is 1-point perspective. \"left\" = the horizontal edges running across the picture \
                 (they stay parallel and level). \"right\" = the depth edges, which all converge to one \
                 vanishing point on the horizon. \"vertical\" = the upright edges."
            }
            PerspectiveMode::TwoPoint => {
                "This is 2-point perspective. \"left\" = horizontal edges converging to the vanishing point \
                 on the left, \"right\" = horizontal edges converging to the vanishing point on the right, \
                 \"vertical\" = the upright edges, which stay vertical and parallel."
            }
            PerspectiveMode::ThreePoint => {
                "This is 3-point perspective. \"left\" and \"right\" = horizontal edges converging to the left \
                 and right vanishing points; \"vertical\" = the upright edges, which converge to a third point \
                 above or below the cube."
            }
            PerspectiveMode::Free => {
                "The cube is seen from an arbitrary angle. Group the edges into three families of parallel \
                 3D edges: \"left\" = the family running most to the left, \"right\" = the family running most \
                 to the right, \"vertical\" = the family closest to upright."
            }
        }
    }

    fn coordinate_rules() -> &'static str {
        "Coordinates: x and y from 0 to 1000 on each axis of the image regardless of its pixel size or \
         aspect ratio, origin at the top-left corner, y growing downwards. Each edge is \
         {\"start\": [x, y], \"end\": [x, y], \"type\": \"left\" | \"right\" | \"vertical\"}."
    }

    fn grading_rules(&self) -> String {
        format!(
            "Treat the reference geometry as ground truth. Compare only angles and convergence; a cube drawn \
             shifted, larger or smaller than the reference must not be penalized. Grade A (best) to F (worst) \
             with this weighted rubric:\n{}Feedback: {} Use markdown.",
            self.rubric, self.feedback_style
        )
    }

    /// One request with both images returning everything at once.
    pub fn single_shot_instructions(&self) -> String {
        format!(
            "Image 1 is the reference render. Image 2 is the student's drawing of the same cube.\n{}\n\
             Extract the visible straight cube edges of BOTH images and classify each one.\n{}\n{}\n\
             Return exactly: {{\"grade\": \"A\"|\"B\"|\"C\"|\"D\"|\"F\", \"feedback\": string, \
             \"referenceEdges\": [edge, ...], \"userEdges\": [edge, ...]}}",
            self.axis_guide(),
            Self::coordinate_rules(),
            self.grading_rules()
        )
    }

    /// Edge extraction for a single image.
    pub fn extraction_instructions(&self, role: ImageRole) -> String {
        format!(
            "The image is {}.\n{}\nFind every visible straight cube edge (at most 12) and classify it. \
             Skip construction lines, shading and scribbles.\n{}\n\
             Return exactly: {{\"edges\": [edge, ...]}}",
            role.describe(),
            self.axis_guide(),
            Self::coordinate_rules()
        )
    }

    /// Comparison of two previously extracted edge sets.
    pub fn comparison_instructions(
        &self,
        reference: &[EdgeSegment<Normalized>],
        drawing: &[EdgeSegment<Normalized>],
    ) -> String {
        format!(
            "{}\n{}\nReference edges (exact):\n{}\nStudent edges (detected from the drawing):\n{}\n{}\n\
             Return exactly: {{\"grade\": \"A\"|\"B\"|\"C\"|\"D\"|\"F\", \"feedback\": string}}",
            self.axis_guide(),
            Self::coordinate_rules(),
            edges_to_json(reference),
            edges_to_json(drawing),
            self.grading_rules()
        )
    }
}
