use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ── game_sessions ──
        manager
            .create_table(
                Table::create()
                    .table(GameSessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GameSessions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(GameSessions::Name).string().not_null())
                    .col(ColumnDef::new(GameSessions::HostUserId).integer().not_null())
                    .col(
                        ColumnDef::new(GameSessions::MaxPlayers)
                            .integer()
                            .not_null()
                            .default(4),
                    )
                    .col(
                        ColumnDef::new(GameSessions::CurrentPlayers)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(GameSessions::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(GameSessions::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // ── session_players ──
        manager
            .create_table(
                Table::create()
                    .table(SessionPlayers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SessionPlayers::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SessionPlayers::SessionId).integer().not_null())
                    .col(ColumnDef::new(SessionPlayers::UserId).integer().not_null())
                    .col(ColumnDef::new(SessionPlayers::Username).string().not_null())
                    .col(ColumnDef::new(SessionPlayers::CharacterId).integer().null())
                    .col(ColumnDef::new(SessionPlayers::CharacterData).json().not_null())
                    .col(
                        ColumnDef::new(SessionPlayers::X)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(SessionPlayers::Y)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(SessionPlayers::MapName).string().null())
                    .col(ColumnDef::new(SessionPlayers::Direction).string().null())
                    .col(ColumnDef::new(SessionPlayers::JoinedAt).timestamp().not_null())
                    .col(ColumnDef::new(SessionPlayers::LastUpdate).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_session_players_session")
                            .from(SessionPlayers::Table, SessionPlayers::SessionId)
                            .to(GameSessions::Table, GameSessions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_session_players_unique")
                    .table(SessionPlayers::Table)
                    .col(SessionPlayers::SessionId)
                    .col(SessionPlayers::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ── chat_messages ──
        manager
            .create_table(
                Table::create()
                    .table(ChatMessages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChatMessages::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ChatMessages::SessionId).integer().not_null())
                    .col(ColumnDef::new(ChatMessages::UserId).integer().not_null())
                    .col(ColumnDef::new(ChatMessages::Username).string().not_null())
                    .col(ColumnDef::new(ChatMessages::Message).text().not_null())
                    .col(ColumnDef::new(ChatMessages::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_chat_messages_session")
                    .table(ChatMessages::Table)
                    .col(ChatMessages::SessionId)
                    .to_owned(),
            )
            .await?;

        // ── session_activities ──
        manager
            .create_table(
                Table::create()
                    .table(SessionActivities::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SessionActivities::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SessionActivities::SessionId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SessionActivities::UserId).integer().null())
                    .col(
                        ColumnDef::new(SessionActivities::Username)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SessionActivities::ActivityType)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SessionActivities::Data).json().not_null())
                    .col(
                        ColumnDef::new(SessionActivities::Sequence)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SessionActivities::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_session_activities_sequence")
                    .table(SessionActivities::Table)
                    .col(SessionActivities::SessionId)
                    .col(SessionActivities::Sequence)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SessionActivities::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ChatMessages::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SessionPlayers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GameSessions::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(Iden)]
enum GameSessions {
    Table,
    Id,
    Name,
    HostUserId,
    MaxPlayers,
    CurrentPlayers,
    IsActive,
    CreatedAt,
}

#[derive(Iden)]
enum SessionPlayers {
    Table,
    Id,
    SessionId,
    UserId,
    Username,
    CharacterId,
    CharacterData,
    X,
    Y,
    MapName,
    Direction,
    JoinedAt,
    LastUpdate,
}

#[derive(Iden)]
enum ChatMessages {
    Table,
    Id,
    SessionId,
    UserId,
    Username,
    Message,
    CreatedAt,
}

#[derive(Iden)]
enum SessionActivities {
    Table,
    Id,
    SessionId,
    UserId,
    Username,
    ActivityType,
    Data,
    Sequence,
    CreatedAt,
}
