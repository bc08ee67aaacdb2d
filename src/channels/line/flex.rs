//! Flex bubble for transcription results

use serde_json::{Value, json};

use crate::channels::OutgoingMessage;

/// Placeholder image shown before the video loads
const PREVIEW_IMAGE_URL: &str = "https://scdn.line-apps.com/n/channel_devcenter/img/fx/01_1_cafe.png";

/// Bubble header
pub const RESULT_HEADER: &str = "翻譯後的文字如下";

/// Body row label
pub const RESULT_LABEL: &str = "內容";

/// Bubble with the uploaded video as hero and `text` underneath
#[must_use]
pub fn video_result_bubble(video_url: &str, text: &str) -> Value {
    json!({
        "type": "bubble",
        "hero": {
            "type": "video",
            "url": video_url,
            "previewUrl": PREVIEW_IMAGE_URL,
            "altContent": {
                "type": "image",
                "url": PREVIEW_IMAGE_URL,
                "size": "full",
                "aspectRatio": "20:13",
                "aspectMode": "cover"
            },
            "action": {
                "type": "uri",
                "label": "Open video",
                "uri": video_url
            },
            "aspectRatio": "20:13"
        },
        "body": {
            "type": "box",
            "layout": "vertical",
            "spacing": "md",
            "contents": [
                {
                    "type": "text",
                    "text": RESULT_HEADER,
                    "wrap": true,
                    "weight": "bold",
                    "gravity": "center"
                },
                {
                    "type": "box",
                    "layout": "baseline",
                    "spacing": "sm",
                    "contents": [
                        {
                            "type": "text",
                            "text": RESULT_LABEL,
                            "wrap": true,
                            "size": "sm",
                            "color": "#AAAAAA",
                            "flex": 1
                        },
                        {
                            "type": "text",
                            "text": text,
                            "wrap": true,
                            "size": "sm",
                            "color": "#666666",
                            "flex": 4
                        }
                    ]
                }
            ]
        }
    })
}

/// Flex message wrapping [`video_result_bubble`]
#[must_use]
pub fn video_result_message(video_url: &str, text: &str) -> OutgoingMessage {
    OutgoingMessage::Flex {
        alt_text: format!("{RESULT_HEADER}：{text}"),
        contents: video_result_bubble(video_url, text),
    }
}
