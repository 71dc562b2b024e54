use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_residents_table::Migration),
            Box::new(m20250101_000002_create_accounts_table::Migration),
            Box::new(m20250101_000003_create_products_table::Migration),
            Box::new(m20250101_000004_create_batches_table::Migration),
            Box::new(m20250101_000005_create_stocks_table::Migration),
            Box::new(m20250101_000006_create_sales_table::Migration),
            Box::new(m20250101_000007_create_sale_items_table::Migration),
        ]
    }
}

// Migration implementations

mod m20250101_000001_create_residents_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000001_create_residents_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Residents::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Residents::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Residents::Cpf)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Residents::Name).string().not_null())
                        .col(ColumnDef::new(Residents::Email).string().null())
                        .col(ColumnDef::new(Residents::Phone).string().null())
                        .col(ColumnDef::new(Residents::PasswordHash).string().not_null())
                        .col(
                            ColumnDef::new(Residents::Role)
                                .string()
                                .not_null()
                                .default("RESIDENT"),
                        )
                        .col(
                            ColumnDef::new(Residents::UnitRole)
                                .string()
                                .not_null()
                                .default("OWNER"),
                        )
                        .col(
                            ColumnDef::new(Residents::Status)
                                .string()
                                .not_null()
                                .default("ACTIVE"),
                        )
                        .col(
                            ColumnDef::new(Residents::Apartment)
                                .string()
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(Residents::Block)
                                .string()
                                .not_null()
                                .default(""),
                        )
                        .col(ColumnDef::new(Residents::OwnerId).uuid().null())
                        .col(
                            ColumnDef::new(Residents::IsFirstLogin)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Residents::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Residents::UpdatedAt).timestamp().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_residents_owner_id")
                                .from(Residents::Table, Residents::OwnerId)
                                .to(Residents::Table, Residents::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_residents_owner_id")
                        .table(Residents::Table)
                        .col(Residents::OwnerId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_residents_status")
                        .table(Residents::Table)
                        .col(Residents::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Residents::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Residents {
        Table,
        Id,
        Cpf,
        Name,
        Email,
        Phone,
        PasswordHash,
        Role,
        UnitRole,
        Status,
        Apartment,
        Block,
        OwnerId,
        IsFirstLogin,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000002_create_accounts_table {

    use sea_orm_migration::prelude::*;

    use super::m20250101_000001_create_residents_table::Residents;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000002_create_accounts_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Accounts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Accounts::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Accounts::ResidentId)
                                .uuid()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Accounts::Balance)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Accounts::CreditLimit)
                                .decimal()
                                .not_null()
                                .default(100),
                        )
                        .col(
                            ColumnDef::new(Accounts::Status)
                                .string()
                                .not_null()
                                .default("ACTIVE"),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_accounts_resident_id")
                                .from(Accounts::Table, Accounts::ResidentId)
                                .to(Residents::Table, Residents::Id),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Accounts::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Accounts {
        Table,
        Id,
        ResidentId,
        Balance,
        CreditLimit,
        Status,
    }
}

mod m20250101_000003_create_products_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000003_create_products_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Products::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(
                            ColumnDef::new(Products::Barcode)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Products::Description).string().null())
                        .col(ColumnDef::new(Products::ImageUrl).string().null())
                        .col(
                            ColumnDef::new(Products::Price)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::MinStock)
                                .integer()
                                .not_null()
                                .default(5),
                        )
                        .col(ColumnDef::new(Products::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Products::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_name")
                        .table(Products::Table)
                        .col(Products::Name)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Products {
        Table,
        Id,
        Name,
        Barcode,
        Description,
        ImageUrl,
        Price,
        MinStock,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000004_create_batches_table {

    use sea_orm_migration::prelude::*;

    use super::m20250101_000003_create_products_table::Products;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000004_create_batches_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Batches::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Batches::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Batches::Code).string().not_null())
                        .col(ColumnDef::new(Batches::ExpiryDate).timestamp().not_null())
                        .col(ColumnDef::new(Batches::ProductId).uuid().not_null())
                        .col(ColumnDef::new(Batches::CreatedAt).timestamp().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_batches_product_id")
                                .from(Batches::Table, Batches::ProductId)
                                .to(Products::Table, Products::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_batches_product_id")
                        .table(Batches::Table)
                        .col(Batches::ProductId)
                        .to_owned(),
                )
                .await?;

            // FEFO reads order on this column
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_batches_expiry_date")
                        .table(Batches::Table)
                        .col(Batches::ExpiryDate)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Batches::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Batches {
        Table,
        Id,
        Code,
        ExpiryDate,
        ProductId,
        CreatedAt,
    }
}

mod m20250101_000005_create_stocks_table {

    use sea_orm_migration::prelude::*;

    use super::m20250101_000004_create_batches_table::Batches;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000005_create_stocks_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Stocks::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Stocks::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Stocks::BatchId)
                                .uuid()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Stocks::Quantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Stocks::UpdatedAt).timestamp().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stocks_batch_id")
                                .from(Stocks::Table, Stocks::BatchId)
                                .to(Batches::Table, Batches::Id),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Stocks::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Stocks {
        Table,
        Id,
        BatchId,
        Quantity,
        UpdatedAt,
    }
}

mod m20250101_000006_create_sales_table {

    use sea_orm_migration::prelude::*;

    use super::m20250101_000001_create_residents_table::Residents;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000006_create_sales_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Sales::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Sales::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Sales::Total)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Sales::PaymentType).string().not_null())
                        .col(
                            ColumnDef::new(Sales::Status)
                                .string()
                                .not_null()
                                .default("COMPLETED"),
                        )
                        .col(ColumnDef::new(Sales::ResidentId).uuid().null())
                        .col(ColumnDef::new(Sales::CreatedAt).timestamp().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sales_resident_id")
                                .from(Sales::Table, Sales::ResidentId)
                                .to(Residents::Table, Residents::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sales_resident_id")
                        .table(Sales::Table)
                        .col(Sales::ResidentId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sales_created_at")
                        .table(Sales::Table)
                        .col(Sales::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Sales::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Sales {
        Table,
        Id,
        Total,
        PaymentType,
        Status,
        ResidentId,
        CreatedAt,
    }
}

mod m20250101_000007_create_sale_items_table {

    use sea_orm_migration::prelude::*;

    use super::m20250101_000003_create_products_table::Products;
    use super::m20250101_000006_create_sales_table::Sales;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000007_create_sale_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(SaleItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SaleItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SaleItems::SaleId).uuid().not_null())
                        .col(ColumnDef::new(SaleItems::ProductId).uuid().not_null())
                        .col(ColumnDef::new(SaleItems::Quantity).integer().not_null())
                        .col(ColumnDef::new(SaleItems::UnitPrice).decimal().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sale_items_sale_id")
                                .from(SaleItems::Table, SaleItems::SaleId)
                                .to(Sales::Table, Sales::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sale_items_product_id")
                                .from(SaleItems::Table, SaleItems::ProductId)
                                .to(Products::Table, Products::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sale_items_sale_id")
                        .table(SaleItems::Table)
                        .col(SaleItems::SaleId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sale_items_product_id")
                        .table(SaleItems::Table)
                        .col(SaleItems::ProductId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SaleItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum SaleItems {
        Table,
        Id,
        SaleId,
        ProductId,
        Quantity,
        UnitPrice,
    }
}
