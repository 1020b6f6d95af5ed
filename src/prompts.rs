//! Instruction templates and prompt assembly for dialogue generation.
//!
//! Every prompt lives here so a template change touches exactly one file, and
//! so tests can inspect the assembled prompt without calling a model.
//!
//! A template has five fields, embedded around the source text in this order:
//!
//! ```text
//! intro
//! <input_text> … </input_text>
//! text_instructions
//! <scratchpad> scratch_pad </scratchpad>
//! prelude
//! <podcast_dialogue> dialog </podcast_dialogue>
//! output contract (JSON schema the answer must follow)
//! ```

/// The five instruction fields that shape the generated podcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionTemplate {
    pub name: &'static str,
    pub intro: &'static str,
    pub text_instructions: &'static str,
    pub scratch_pad: &'static str,
    pub prelude: &'static str,
    pub dialog: &'static str,
}

impl InstructionTemplate {
    /// Long-form Chinese NPR-style podcast. Default.
    pub fn podcast_zh() -> Self {
        Self {
            name: "podcast-zh",
            intro: PODCAST_ZH_INTRO,
            text_instructions: PODCAST_ZH_TEXT,
            scratch_pad: PODCAST_ZH_SCRATCH_PAD,
            prelude: PODCAST_ZH_PRELUDE,
            dialog: PODCAST_ZH_DIALOG,
        }
    }

    /// The same show format, instructed in English.
    pub fn podcast_en() -> Self {
        Self {
            name: "podcast",
            intro: PODCAST_EN_INTRO,
            text_instructions: PODCAST_EN_TEXT,
            scratch_pad: PODCAST_EN_SCRATCH_PAD,
            prelude: PODCAST_EN_PRELUDE,
            dialog: PODCAST_EN_DIALOG,
        }
    }

    /// Look up a built-in template by name.
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "podcast-zh" | "podcast (Chinese)" => Some(Self::podcast_zh()),
            "podcast" | "podcast-en" => Some(Self::podcast_en()),
            _ => None,
        }
    }

    /// Names accepted by [`InstructionTemplate::by_name`].
    pub const NAMES: &'static [&'static str] = &["podcast-zh", "podcast"];
}

impl Default for InstructionTemplate {
    fn default() -> Self {
        Self::podcast_zh()
    }
}

/// Appended to every prompt. The structure here must stay in sync with
/// [`crate::script::DialogueScript`].
pub const OUTPUT_CONTRACT: &str = r#"Respond with a single JSON object and nothing else. Do not wrap it in Markdown fences.
The object must have exactly this shape:

{
  "scratchpad": "<your brainstorming notes and outline, as one string>",
  "dialogue": [
    { "speaker": "speaker-1", "text": "<what the host says>" },
    { "speaker": "speaker-2", "text": "<what the guest says>" }
  ]
}

"speaker" must be either "speaker-1" (host) or "speaker-2" (guest).
"text" must be non-empty spoken words only: no stage directions, no speaker names."#;

/// Build the single prompt sent to the LLM.
pub fn build_dialogue_prompt(text: &str, template: &InstructionTemplate) -> String {
    format!(
        "{intro}\n\n\
Here is the original input text:\n\n\
<input_text>\n{text}\n</input_text>\n\n\
{text_instructions}\n\n\
<scratchpad>\n{scratch_pad}\n</scratchpad>\n\n\
{prelude}\n\n\
<podcast_dialogue>\n{dialog}\n</podcast_dialogue>\n\n\
{contract}",
        intro = template.intro.trim_end(),
        text = text,
        text_instructions = template.text_instructions.trim_end(),
        scratch_pad = template.scratch_pad.trim_end(),
        prelude = template.prelude.trim_end(),
        dialog = template.dialog.trim_end(),
        contract = OUTPUT_CONTRACT,
    )
}

// ── podcast-zh ───────────────────────────────────────────────────────────

const PODCAST_ZH_INTRO: &str = "你的任务是将提供的输入文本转变为一个深度、引人入胜、信息丰富的播客对话，风格类似NPR，但更加深入和具体。输入文本可能来自各种来源，可能是未经整理的或非结构化的。
你的目标是提取关键点，识别定义和可能在播客中深入讨论的有趣事实。要善于使用具体例子和类比来解释抽象或复杂的概念，使其易于理解。
为广泛的听众仔细定义所有使用的术语，并提供深入的解释和背景信息。
";

const PODCAST_ZH_TEXT: &str = "首先，仔细阅读输入文本，识别主要话题、关键点和任何有趣的事实或轶事。思考如何以一种深入且引人入胜的方式呈现这些信息，适合高质量的呈现。特别注意可能需要更详细解释或具体例子的复杂概念。";

const PODCAST_ZH_SCRATCH_PAD: &str = "集思广益，想出一些讨论你在输入文本中识别到的主要话题和关键点的创新方式。考虑使用丰富的类比、具体的实际例子、引人入胜的故事或假设场景，让内容对听众更具相关性和吸引力。
对于每个关键概念，至少构思2-3个具体的例子或类比，以帮助听众更好地理解。这些例子应该涵盖不同的角度，以照顾到不同背景的听众。
虽然你的播客应面向普通大众，但不要害怕深入探讨复杂的主题。相反，要善于用简单的语言和生动的例子来解释复杂的概念。考虑如何将抽象的想法与日常生活联系起来。
利用你的想象力填补输入文本中的任何空白，或提出一些值得深入探讨的发人深省的问题。目标是创造一个既有深度又引人入胜的对话，因此在方法上要富有创意和洞察力。
明确地定义所有使用的术语，并花时间解释其背景和重要性。考虑这些概念如何与更广泛的主题或当前事件联系起来。
在这里写下你的头脑风暴想法和播客对话的详细大纲。务必记录你想在结尾重复的关键见解和收获，以及你打算用来解释这些见解的具体例子。
确保让它既有深度又令人兴奋，能够激发听众的思考和讨论。
";

const PODCAST_ZH_PRELUDE: &str = "现在你已经进行了深入的头脑风暴并创建了一个详细大纲，是时候编写实际的播客对话了。目标是创造一个既有深度又自然流畅的对话。结合你头脑风暴中的最佳想法和例子，确保以简单易懂而又深入的方式解释复杂的主题。
";

const PODCAST_ZH_DIALOG: &str = "在这里写下一个非常长、深入且引人入胜的播客对话，基于你在头脑风暴会议中提出的关键点、创意和具体例子。使用自然的对话语气，并包含必要的上下文、解释和例子，使复杂的内容易于普通听众理解。
不要为主持人和嘉宾使用虚构的名字，而是让听众体验一个深入且沉浸式的经历。不要包括像[主持人]或[嘉宾]这样的占位符。设计你的输出以供大声朗读——它将被直接转换为音频。
使对话尽可能长且详细，同时保持在主题上并维持引人入胜的流畅性。对于每个关键概念，至少使用2-3个具体的例子或类比来解释。这些例子应该是多样化的，以适应不同背景的听众。
不要害怕深入探讨复杂的主题。相反，要善于用简单的语言和生动的例子来解释复杂的概念。考虑如何将抽象的想法与日常生活联系起来，使用听众熟悉的情景来阐述深奥的概念。
在讨论过程中，主持人和嘉宾应该提出思考性的问题，并探讨这些概念更广泛的影响和应用。鼓励听众思考这些想法如何与他们的生活或更大的社会问题相关联。
充分利用你的输出能力，创造尽可能长的播客节目，同时以深入且有趣的方式传达输入文本中的关键信息。
在对话的最后，主持人和嘉宾应自然总结他们讨论的主要见解和收获。这应从对话中自然流出，以随意、对话的方式重复关键点。避免显得像是显而易见的总结——目标是在结束前最后一次加强核心思想，同时提供一些具体的行动建议或进一步思考的方向。
播客应约有30,000字，以确保有足够的篇幅深入探讨主题。
";

// ── podcast (English) ────────────────────────────────────────────────────

const PODCAST_EN_INTRO: &str = "Your task is to take the input text provided and turn it into an in-depth, engaging, informative podcast dialogue in the style of NPR, but deeper and more concrete. The input text may be messy or unstructured, as it could come from a variety of sources.
Your goal is to extract the key points, identify definitions, and find interesting facts that could be discussed in a podcast. Use concrete examples and analogies to make abstract or complex ideas easy to follow.
Define every term carefully for a broad audience and give thorough explanations and background.
";

const PODCAST_EN_TEXT: &str = "First, carefully read through the input text and identify the main topics, key points, and any interesting facts or anecdotes. Think about how you could present this information in a deep yet engaging way suitable for a high-quality presentation. Pay special attention to complex concepts that need fuller explanation or concrete examples.";

const PODCAST_EN_SCRATCH_PAD: &str = "Brainstorm creative ways to discuss the main topics and key points you identified in the input text. Consider rich analogies, concrete real-world examples, storytelling, or hypothetical scenarios that make the content relatable for listeners.
For each key concept, come up with at least two or three concrete examples or analogies, covering different angles for listeners with different backgrounds.
Keep the podcast accessible to a general audience, but do not shy away from complex topics; explain them in plain language with vivid examples and relate abstract ideas to everyday life.
Use your imagination to fill in any gaps in the input text or to raise thought-provoking questions worth exploring.
Write your brainstorming ideas and a detailed outline for the podcast dialogue here. Note the key insights and takeaways you want to repeat at the end, and the examples you plan to use for them.
";

const PODCAST_EN_PRELUDE: &str = "Now that you have brainstormed ideas and created a detailed outline, it is time to write the actual podcast dialogue. Aim for a conversation that is both deep and natural. Bring in the best ideas and examples from your brainstorming and explain complex topics in an approachable yet thorough way.
";

const PODCAST_EN_DIALOG: &str = "Write a very long, in-depth and engaging podcast dialogue here, based on the key points, ideas and concrete examples from your brainstorming session. Use a natural, conversational tone and include whatever context, explanations and examples a general listener needs.
Do not use made-up names for the host and guest, and do not include placeholders like [Host] or [Guest]. Design your output to be read aloud; it will be converted directly into audio.
Make the dialogue as long and detailed as possible while staying on topic and keeping an engaging flow. Use at least two or three concrete examples or analogies for every key concept.
Throughout the discussion the host and guest should ask thoughtful questions and explore wider implications and applications of the ideas.
At the end, the host and guest should naturally summarise the main insights and takeaways. This should flow from the conversation rather than feel like an obvious recap, and it can close with a concrete suggestion or a question to keep thinking about.
";
