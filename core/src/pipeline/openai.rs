//! `Generator` implementation backed by an OpenAI-compatible Chat
//! Completions API via `async-openai`. Works against any provider that
//! speaks the same wire format by pointing `OpenAIConfig` at a different
//! base URL (`Provider::OpenAiCompatible`).

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionMessageToolCall, ChatCompletionMessageToolCalls,
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessage, ChatCompletionRequestToolMessageArgs,
        ChatCompletionRequestUserMessage, ChatCompletionTool, ChatCompletionToolChoiceOption,
        ChatCompletionTools, CreateChatCompletionRequestArgs, FunctionCall, FunctionObject,
        ToolChoiceOptions,
    },
    Client,
};
use async_trait::async_trait;
use config::GenerationDefaults;
use store::{Block, BlockType, Message, Role};

use crate::tools::ToolSpec;

use super::generator::{GenerateError, Generator};

/// Drives one OpenAI-compatible provider. `base_url` and `api_key` come
/// from the resolved model entry and its credential; `None` base url means
/// the provider's own default host.
pub struct OpenAiGenerator {
    client: Client<OpenAIConfig>,
    model_id: String,
}

impl OpenAiGenerator {
    pub fn new(model_id: impl Into<String>, api_key: &str, base_url: Option<&str>) -> Self {
        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(url) = base_url {
            config = config.with_api_base(url);
        }
        Self {
            client: Client::with_config(config),
            model_id: model_id.into(),
        }
    }

    fn message_to_request(message: &Message) -> Vec<ChatCompletionRequestMessage> {
        match message.role {
            Role::User => vec![ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessage::from(message.text_content().as_str()),
            )],
            Role::Assistant => {
                let text = message.text_content();
                let tool_calls: Vec<ChatCompletionMessageToolCall> = message
                    .tool_calls()
                    .into_iter()
                    .filter_map(|b| {
                        let (name, params) = b.parse_tool_call()?;
                        Some(ChatCompletionMessageToolCall {
                            id: b.id.clone().unwrap_or_default(),
                            r#type: Default::default(),
                            function: FunctionCall {
                                name,
                                arguments: params.to_string(),
                            },
                        })
                    })
                    .collect();
                let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
                if !text.is_empty() {
                    builder.content(text);
                }
                if !tool_calls.is_empty() {
                    builder.tool_calls(tool_calls);
                }
                match builder.build() {
                    Ok(m) => vec![ChatCompletionRequestMessage::Assistant(m)],
                    Err(_) => vec![],
                }
            }
            Role::ToolResult => message
                .blocks
                .iter()
                .filter(|b| b.block_type == BlockType::Content && b.id.is_some())
                .filter_map(|b| {
                    let id = b.id.clone()?;
                    ChatCompletionRequestToolMessageArgs::default()
                        .tool_call_id(id)
                        .content(b.content.clone())
                        .build()
                        .ok()
                })
                .map(ChatCompletionRequestMessage::Tool)
                .collect(),
        }
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn generate(
        &self,
        dialog: &[Message],
        system_prompt: &str,
        tools: &[ToolSpec],
        opts: &GenerationDefaults,
    ) -> Result<Message, GenerateError> {
        let mut openai_messages = vec![ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessage::from(system_prompt),
        )];
        for message in dialog {
            openai_messages.extend(Self::message_to_request(message));
        }

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(self.model_id.clone());
        args.messages(openai_messages);

        if !tools.is_empty() {
            let chat_tools: Vec<ChatCompletionTools> = tools
                .iter()
                .map(|t| {
                    ChatCompletionTools::Function(ChatCompletionTool {
                        function: FunctionObject {
                            name: t.name.clone(),
                            description: t.description.clone(),
                            parameters: Some(t.input_schema.clone()),
                            ..Default::default()
                        },
                    })
                })
                .collect();
            args.tools(chat_tools);
            args.tool_choice(ChatCompletionToolChoiceOption::Mode(ToolChoiceOptions::Auto));
        }
        if let Some(t) = opts.temperature {
            args.temperature(t as f32);
        }
        if let Some(mt) = opts.max_tokens {
            args.max_completion_tokens(mt);
        }
        if let Some(p) = opts.top_p {
            args.top_p(p as f32);
        }
        if let Some(fp) = opts.frequency_penalty {
            args.frequency_penalty(fp as f32);
        }
        if let Some(pp) = opts.presence_penalty {
            args.presence_penalty(pp as f32);
        }
        if let Some(n) = opts.number_of_responses {
            args.n(n);
        }

        let request = args
            .build()
            .map_err(|e| GenerateError::Provider(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| GenerateError::Provider(e.to_string()))?;

        let choice = response.choices.into_iter().next().ok_or(GenerateError::NoChoices)?;
        let msg = choice.message;

        let mut blocks = Vec::new();
        if let Some(content) = msg.content {
            if !content.is_empty() {
                blocks.push(Block::text(content));
            }
        }
        for tc in msg.tool_calls.unwrap_or_default() {
            if let ChatCompletionMessageToolCalls::Function(f) = tc {
                blocks.push(Block::tool_call(
                    f.id,
                    &f.function.name,
                    serde_json::from_str(&f.function.arguments).unwrap_or(serde_json::Value::Null),
                ));
            }
        }
        Ok(Message::assistant(blocks))
    }
}
