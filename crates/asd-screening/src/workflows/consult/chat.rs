//! Patient/doctor conversations kept as one JSON document in the client's local store.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::session::storage::{read_json, update_json, write_json, KeyValueStore, StorageError};

/// Local storage key holding every conversation.
pub const CHATS_KEY: &str = "chats";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderRole {
    Patient,
    Doctor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub sender_role: SenderRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub doctor_id: String,
    pub doctor_name: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn id_for(patient_id: &str, doctor_id: &str) -> String {
        format!("conv-{patient_id}-{doctor_id}")
    }
}

/// Someone taking part in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub name: String,
}

impl Participant {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("conversation {0} does not exist")]
    ConversationNotFound(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug)]
pub struct ChatRepository<S> {
    store: Arc<S>,
}

impl<S> Clone for ChatRepository<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: KeyValueStore> ChatRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Stored conversations, or the seeded ones when nothing readable is stored.
    pub fn conversations(&self) -> Result<Vec<Conversation>, ChatError> {
        stored_or_seeded(read_json(self.store.as_ref(), CHATS_KEY))
    }

    pub fn conversation(&self, id: &str) -> Result<Option<Conversation>, ChatError> {
        Ok(self
            .conversations()?
            .into_iter()
            .find(|conversation| conversation.id == id))
    }

    /// The existing conversation between the pair, or a new empty one.
    pub fn open_conversation(
        &self,
        patient: &Participant,
        doctor: &Participant,
    ) -> Result<Conversation, ChatError> {
        update_json(
            self.store.as_ref(),
            CHATS_KEY,
            |stored| -> Result<(Option<Vec<Conversation>>, Conversation), ChatError> {
                let mut conversations = stored_or_seeded(stored)?;
                if let Some(existing) = conversations.iter().find(|conversation| {
                    conversation.patient_id == patient.id && conversation.doctor_id == doctor.id
                }) {
                    return Ok((None, existing.clone()));
                }

                let conversation = Conversation {
                    id: Conversation::id_for(&patient.id, &doctor.id),
                    patient_id: patient.id.clone(),
                    patient_name: patient.name.clone(),
                    doctor_id: doctor.id.clone(),
                    doctor_name: doctor.name.clone(),
                    messages: Vec::new(),
                };
                conversations.push(conversation.clone());
                debug!(conversation = %conversation.id, "conversation opened");
                Ok((Some(conversations), conversation))
            },
        )
    }

    /// Appends a message. Blank text is ignored and yields `None`.
    pub fn send_message(
        &self,
        conversation_id: &str,
        sender: &Participant,
        role: SenderRole,
        text: &str,
    ) -> Result<Option<ChatMessage>, ChatError> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        update_json(
            self.store.as_ref(),
            CHATS_KEY,
            |stored| -> Result<(Option<Vec<Conversation>>, Option<ChatMessage>), ChatError> {
                let mut conversations = stored_or_seeded(stored)?;
                let conversation = conversations
                    .iter_mut()
                    .find(|conversation| conversation.id == conversation_id)
                    .ok_or_else(|| ChatError::ConversationNotFound(conversation_id.to_string()))?;

                let now = Utc::now();
                let message = ChatMessage {
                    id: unique_message_id(conversation, now),
                    sender_id: sender.id.clone(),
                    sender_name: sender.name.clone(),
                    sender_role: role,
                    text: text.to_string(),
                    timestamp: now,
                };
                conversation.messages.push(message.clone());
                Ok((Some(conversations), Some(message)))
            },
        )
    }

    /// Restores the seeded conversations.
    pub fn clear_history(&self) -> Result<Vec<Conversation>, ChatError> {
        let seeded = seed_conversations(Utc::now());
        self.save(&seeded)?;
        Ok(seeded)
    }

    fn save(&self, conversations: &[Conversation]) -> Result<(), ChatError> {
        write_json(self.store.as_ref(), CHATS_KEY, conversations)?;
        Ok(())
    }
}

fn stored_or_seeded(
    stored: Result<Option<Vec<Conversation>>, StorageError>,
) -> Result<Vec<Conversation>, ChatError> {
    match stored {
        Ok(Some(conversations)) => Ok(conversations),
        Ok(None) => Ok(seed_conversations(Utc::now())),
        Err(StorageError::Corrupt { source, .. }) => {
            warn!(error = %source, "stored conversations unreadable; using defaults");
            Ok(seed_conversations(Utc::now()))
        }
        Err(err) => Err(err.into()),
    }
}

/// `msg-{millis}`, bumped past any id already used in the conversation.
fn unique_message_id(conversation: &Conversation, now: DateTime<Utc>) -> String {
    let mut millis = now.timestamp_millis();
    loop {
        let id = format!("msg-{millis}");
        if !conversation.messages.iter().any(|message| message.id == id) {
            return id;
        }
        millis += 1;
    }
}

pub fn seed_conversations(now: DateTime<Utc>) -> Vec<Conversation> {
    vec![
        seeded(
            "1",
            "John Doe",
            "1",
            "Dr. Rajesh Sharma",
            now - Duration::minutes(120),
            [
                (SenderRole::Patient, "Hi Dr. Sharma, my son has been showing some concerning behaviors lately. He avoids eye contact and doesn't like playing with other kids."),
                (SenderRole::Doctor, "Thank you for reaching out, John. Those are important observations. Can you tell me more about these behaviors? When did you first notice them?"),
                (SenderRole::Patient, "He's 6 years old. We noticed it around age 2. He also has repetitive behaviors - lining up toys for hours and gets upset with any changes to routine."),
                (SenderRole::Doctor, "I recommend scheduling an fMRI screening. This non-invasive test can analyze brain connectivity patterns. It takes about 30 minutes and we get results within 24-48 hours."),
                (SenderRole::Patient, "How accurate is this fMRI test? I want to make sure before putting my son through it."),
                (SenderRole::Doctor, "The accuracy is 92.5% based on extensive clinical studies. It's completely safe for children - no radiation, just imaging. Shall I send you the consent form?"),
            ],
        ),
        seeded(
            "2",
            "Sarah Smith",
            "2",
            "Dr. Priya Kapoor",
            now - Duration::minutes(240),
            [
                (SenderRole::Doctor, "Hello Sarah, I wanted to check in on Emma's progress. How has she been adjusting to the behavioral therapy sessions?"),
                (SenderRole::Patient, "Hi Dr. Kapoor! Emma is doing much better. The social stories you recommended really helped. She's more confident at school now."),
                (SenderRole::Doctor, "That's wonderful to hear! Any improvements with sensory sensitivities? The light sensitivity especially?"),
                (SenderRole::Patient, "Yes! She tolerates bright lights much better now. We've been using the weighted blanket too, which helps her relax during bedtime."),
                (SenderRole::Doctor, "Excellent! Continue with the current approach. I'd like to schedule a follow-up appointment next month to assess overall progress. Does that work?"),
                (SenderRole::Patient, "That works perfectly. Thank you so much for your support, Dr. Kapoor. Emma is a different child now!"),
            ],
        ),
    ]
}

/// Messages one minute apart starting at `started`.
fn seeded<const N: usize>(
    patient_id: &str,
    patient_name: &str,
    doctor_id: &str,
    doctor_name: &str,
    started: DateTime<Utc>,
    lines: [(SenderRole, &str); N],
) -> Conversation {
    let messages = lines
        .into_iter()
        .enumerate()
        .map(|(index, (role, text))| {
            let sender_name = match role {
                SenderRole::Patient => patient_name,
                SenderRole::Doctor => doctor_name,
            };
            ChatMessage {
                id: format!("m{}", index + 1),
                sender_id: patient_id.to_string(),
                sender_name: sender_name.to_string(),
                sender_role: role,
                text: text.to_string(),
                timestamp: started + Duration::minutes(index as i64),
            }
        })
        .collect();

    Conversation {
        id: Conversation::id_for(patient_id, doctor_id),
        patient_id: patient_id.to_string(),
        patient_name: patient_name.to_string(),
        doctor_id: doctor_id.to_string(),
        doctor_name: doctor_name.to_string(),
        messages,
    }
}
