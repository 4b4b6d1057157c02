use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use parcel_db::models::{CollaborationRow, DemoRequestRow, SupportMessageRow, TicketRow};
use parcel_db::{Database, timestamp};
use parcel_gateway::dispatcher::Dispatcher;
use parcel_types::api::{CollaborationSubmission, DemoRequestSubmission, OpenTicketRequest};
use parcel_types::events::GatewayEvent;
use parcel_types::models::{RequestStatus, SupportMessage, SupportTicket, TicketStatus};

use crate::blocking;
use crate::convert::{collect_valid, message_from_row, ticket_from_row};
use crate::error::SupportError;

/// Customer support tickets and the public demo / collaboration forms.
#[derive(Clone)]
pub struct SupportService {
    db: Arc<Database>,
    dispatcher: Dispatcher,
}

impl SupportService {
    pub fn new(db: Arc<Database>, dispatcher: Dispatcher) -> Self {
        Self { db, dispatcher }
    }

    pub async fn open_ticket(&self, user_id: &str, request: OpenTicketRequest) -> Result<SupportTicket, SupportError> {
        let subject = required(&request.subject, "subject")?;
        let message = required(&request.message, "message")?;

        let ticket = SupportTicket {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            subject,
            message,
            status: TicketStatus::Open,
            created_at: Utc::now(),
        };
        let row = TicketRow {
            id: ticket.id.to_string(),
            user_id: ticket.user_id.clone(),
            subject: ticket.subject.clone(),
            message: ticket.message.clone(),
            status: ticket.status.as_str().to_string(),
            created_at: timestamp(ticket.created_at),
        };
        blocking(&self.db, move |db| db.insert_ticket(&row)).await?;

        info!("Support ticket {} opened by {}", ticket.id, user_id);
        self.dispatcher.notify_admins(GatewayEvent::notice(
            "New Support Ticket",
            ticket.subject.clone(),
        ));
        Ok(ticket)
    }

    pub async fn list_own_tickets(&self, user_id: &str) -> Result<Vec<SupportTicket>, SupportError> {
        let uid = user_id.to_string();
        let rows = blocking(&self.db, move |db| db.list_tickets_for_user(&uid)).await?;
        Ok(collect_valid(rows, "support ticket", ticket_from_row))
    }

    /// Conversation on one of the caller's tickets. Someone else's ticket
    /// is reported as not found.
    pub async fn ticket_messages(&self, ticket_id: Uuid, user_id: &str) -> Result<Vec<SupportMessage>, SupportError> {
        self.owned_ticket(ticket_id, user_id).await?;

        let tid = ticket_id.to_string();
        let rows = blocking(&self.db, move |db| db.list_ticket_messages(&tid)).await?;
        Ok(collect_valid(rows, "support message", message_from_row))
    }

    /// Customer reply on their own ticket.
    pub async fn reply(&self, ticket_id: Uuid, user_id: &str, message: &str) -> Result<SupportMessage, SupportError> {
        let message = required(message, "message")?;
        let ticket = self.owned_ticket(ticket_id, user_id).await?;

        let reply = SupportMessage {
            id: Uuid::new_v4(),
            ticket_id,
            user_id: user_id.to_string(),
            message,
            is_admin: false,
            created_at: Utc::now(),
        };
        let row = SupportMessageRow {
            id: reply.id.to_string(),
            ticket_id: ticket_id.to_string(),
            user_id: reply.user_id.clone(),
            message: reply.message.clone(),
            is_admin: false,
            created_at: timestamp(reply.created_at),
        };
        blocking(&self.db, move |db| db.insert_support_message(&row)).await?;

        self.dispatcher.notify_admins(GatewayEvent::notice(
            "New Customer Reply",
            format!("Re: {}", ticket.subject),
        ));
        Ok(reply)
    }

    async fn owned_ticket(&self, ticket_id: Uuid, user_id: &str) -> Result<TicketRow, SupportError> {
        let tid = ticket_id.to_string();
        let ticket = blocking(&self.db, move |db| db.get_ticket(&tid)).await?;
        match ticket {
            Some(ticket) if ticket.user_id == user_id => Ok(ticket),
            _ => Err(SupportError::NotFound),
        }
    }

    pub async fn submit_demo_request(&self, submission: DemoRequestSubmission) -> Result<Uuid, SupportError> {
        let id = Uuid::new_v4();
        let row = DemoRequestRow {
            id: id.to_string(),
            name: required(&submission.name, "name")?,
            email: email(&submission.email)?,
            company: optional(submission.company),
            message: optional(submission.message),
            status: RequestStatus::Pending.as_str().to_string(),
            created_at: timestamp(Utc::now()),
        };
        let name = row.name.clone();
        blocking(&self.db, move |db| db.insert_demo_request(&row)).await?;

        info!("Demo request {} received", id);
        self.dispatcher
            .notify_admins(GatewayEvent::notice("New Demo Request", format!("From {}", name)));
        Ok(id)
    }

    pub async fn submit_collaboration(&self, submission: CollaborationSubmission) -> Result<Uuid, SupportError> {
        let id = Uuid::new_v4();
        let row = CollaborationRow {
            id: id.to_string(),
            name: required(&submission.name, "name")?,
            email: email(&submission.email)?,
            company: optional(submission.company),
            proposal: required(&submission.proposal, "proposal")?,
            status: RequestStatus::Pending.as_str().to_string(),
            created_at: timestamp(Utc::now()),
        };
        let name = row.name.clone();
        blocking(&self.db, move |db| db.insert_collaboration(&row)).await?;

        info!("Collaboration proposal {} received", id);
        self.dispatcher.notify_admins(GatewayEvent::notice(
            "New Collaboration Proposal",
            format!("From {}", name),
        ));
        Ok(id)
    }
}

fn required(value: &str, field: &str) -> Result<String, SupportError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(SupportError::Invalid(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn email(value: &str) -> Result<String, SupportError> {
    let value = required(value, "email")?;
    let valid = value
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid {
        return Err(SupportError::Invalid("email is not valid".to_string()));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> (SupportService, Arc<Database>) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        (SupportService::new(db.clone(), Dispatcher::new()), db)
    }

    fn ticket_request() -> OpenTicketRequest {
        OpenTicketRequest {
            subject: "  Missing parcel ".into(),
            message: "Tracking has not moved in a week".into(),
        }
    }

    #[tokio::test]
    async fn open_and_list_own_tickets() {
        let (support, _db) = service();
        let ticket = support.open_ticket("u1", ticket_request()).await.unwrap();
        assert_eq!(ticket.subject, "Missing parcel");
        assert_eq!(ticket.status, TicketStatus::Open);

        support.open_ticket("u2", ticket_request()).await.unwrap();

        let mine = support.list_own_tickets("u1").await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, ticket.id);
    }

    #[tokio::test]
    async fn blank_subject_is_rejected() {
        let (support, _db) = service();
        let err = support
            .open_ticket("u1", OpenTicketRequest { subject: " ".into(), message: "hi".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, SupportError::Invalid(_)));
    }

    #[tokio::test]
    async fn replies_are_owner_only() {
        let (support, _db) = service();
        let ticket = support.open_ticket("u1", ticket_request()).await.unwrap();

        let reply = support.reply(ticket.id, "u1", " any news? ").await.unwrap();
        assert_eq!(reply.message, "any news?");
        assert!(!reply.is_admin);

        assert!(matches!(
            support.reply(ticket.id, "intruder", "hello").await,
            Err(SupportError::NotFound)
        ));
        assert!(matches!(
            support.ticket_messages(ticket.id, "intruder").await,
            Err(SupportError::NotFound)
        ));

        let messages = support.ticket_messages(ticket.id, "u1").await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, reply.id);
    }

    #[tokio::test]
    async fn demo_request_stored_as_pending() {
        let (support, db) = service();
        let id = support
            .submit_demo_request(DemoRequestSubmission {
                name: "Lena".into(),
                email: "lena@shop.example".into(),
                company: Some("  ".into()),
                message: Some("We ship 200 parcels a week".into()),
            })
            .await
            .unwrap();

        let rows = db.list_demo_requests().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, id.to_string());
        assert_eq!(rows[0].status, "pending");
        assert_eq!(rows[0].company, None);
    }

    #[tokio::test]
    async fn collaboration_requires_valid_email_and_proposal() {
        let (support, db) = service();
        let submission = CollaborationSubmission {
            name: "Nordic Freight".into(),
            email: "not-an-email".into(),
            company: None,
            proposal: "Shared warehouse in Oulu".into(),
        };
        assert!(matches!(
            support.submit_collaboration(submission.clone()).await,
            Err(SupportError::Invalid(_))
        ));

        let empty_proposal = CollaborationSubmission {
            email: "ops@freight.example".into(),
            proposal: String::new(),
            ..submission.clone()
        };
        assert!(support.submit_collaboration(empty_proposal).await.is_err());

        let ok = CollaborationSubmission { email: "ops@freight.example".into(), ..submission };
        support.submit_collaboration(ok).await.unwrap();
        assert_eq!(db.count_collaborations().unwrap(), 1);
    }
}
