//! Prompt templates for captioning and analysis.
//!
//! Every prompt lives here so the wording can change without touching the
//! request plumbing, and so tests can inspect prompts without a live model.
//! The JSON schema the analysis prompt asks for is mirrored by
//! [`crate::analysis::AnalysisResult`]; keep the two in sync.

use crate::config::Tone;

/// Opening instruction of the analysis prompt.
pub const ANALYSIS_PREAMBLE: &str =
    "Analyze the project and return strictly valid JSON with the following keys:";

/// The five-key schema. `{tone}` is replaced with the tone label.
pub const ANALYSIS_SCHEMA: &str = r#"1. "strengths": 3-5 strengths of the project (array of strings)
2. "weaknesses": 3-5 weaknesses, each with a recommendation (array of strings)
3. "fact_check": 3-4 checks of the key claims; be picky and thorough (array of objects with fields "claim", "verdict", "explanation"; "verdict" is exactly one of "truth", "false", "unverifiable")
4. "storytelling_script": a speech script ({tone}) - an object with fields "introduction", "main_part", "conclusion"
5. "tricky_questions": 4-5 very tricky questions, as at a thesis defense (array of strings)"#;

/// Closing reminder; some models add prose around the object without it.
pub const ANALYSIS_FOOTER: &str =
    "Return only the JSON object, with no commentary and no Markdown fences.";

/// Label introducing the project material.
pub const PROJECT_HEADER: &str = "Project:";

/// Build the storytelling instruction for `tone`.
///
/// Only the phrasing varies by tone; the three required parts are fixed.
pub fn storytelling_instruction(tone: Tone) -> String {
    let style = match tone {
        Tone::Inspiring => {
            "Style: lively and concrete, no abstractions; build energy toward the conclusion."
        }
        Tone::Formal => {
            "Style: precise and restrained, suited to an expert jury; avoid slang and exclamations."
        }
        Tone::PopularScience => {
            "Style: explain every technical idea with a familiar analogy; no unexplained jargon."
        }
    };

    format!(
        r#"Write a gripping talk script in a {} TED style with three clearly separated parts:
1. "introduction": a powerful opening that states the problem and introduces the project name
2. "main_part": a detailed main part describing the goal, the course of the work and the key novelty
3. "conclusion": a convincing conclusion that sums up and stresses the significance of the results

({})"#,
        tone.label().to_lowercase(),
        style
    )
}

/// Assemble the full analysis prompt around `project_text`.
pub fn analysis_prompt(project_text: &str, tone: Tone) -> String {
    format!(
        "{}\n{}\n\n{}\n\n{}\n\n{}\n{}\n",
        ANALYSIS_PREAMBLE,
        ANALYSIS_SCHEMA.replace("{tone}", tone.label()),
        storytelling_instruction(tone),
        ANALYSIS_FOOTER,
        PROJECT_HEADER,
        project_text
    )
}

/// Caption request for image number `index` (1-based).
///
/// `note` is appended verbatim, e.g. `" (truncated)"` when the payload was cut.
pub fn caption_prompt(index: usize, note: &str) -> String {
    format!("Briefly describe what is shown in image #{index}{note}.")
}

/// Example talk text, offered to prefill the notes input.
pub const EXAMPLE_NOTES: &str = "Good afternoon, colleagues, experts and partners.
Today we present a project at the crossroads of future technology, sustainable development and a new way of working with the world ocean.
Project \"Octopus\" is more than a prototype. It is a step toward civilised, ecological and high-tech collection of polymetallic nodules from the sea floor.
Why does it matter?
Polymetallic nodules contain strategic metals: manganese, nickel, cobalt and copper, the base of green energy, batteries and microelectronics.
The ocean floor holds three to four times more of these resources than all the land on Earth.
But there is a problem.
Current extraction methods are outdated and cause catastrophic damage to ecosystems: heavy dredges kill more than 51% of microorganisms.
What we propose
A mobile autonomous platform with a biomimetic manipulator inspired by an octopus tentacle and an elephant trunk.
The manipulator follows a logarithmic spiral, grips objects of different shapes and lifts loads 260 times heavier than its own weight.
It works in manual mode through an app or autonomously; built-in machine vision classifies nodules on the sea floor.
What has been done
Patent research, 3D models, electronics, the first assembled prototype and laboratory tests.
Compared with traditional methods we reduced sea-floor damage by 72%, lift one nodule in 10 seconds and run up to 1.8 hours on one charge.
Who we are
A team of nine engineers, programmers and circuit designers from different regions.
What is next
Open-water trials, a communication and stabilisation system, and a partner for a pilot industrial contract.
Octopus is not just a machine. It is a philosophy of careful, respectful and smart exploration of the ocean.
Thank you for your attention.";
