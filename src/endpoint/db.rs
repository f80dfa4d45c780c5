//! Relational export. Mirrors a snapshot into `region` and `endpoint` tables
//! for storage-backed consumers, upserting on each run.

use rusqlite::{Connection, Result, params};

use crate::catalog::Region;
use crate::collection::EndpointCollection;

use super::EndpointRecord;

pub fn create_tables_if_not_exists(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS region (
            region_name TEXT NOT NULL,
            partition_name TEXT NOT NULL,
            description TEXT NOT NULL,
            PRIMARY KEY (region_name, partition_name)
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS endpoint (
            service_name TEXT NOT NULL,
            partition_name TEXT NOT NULL,
            region_name TEXT NOT NULL,
            endpoint_default_hostname TEXT,
            endpoint_default_has_ipv4 INTEGER NOT NULL,
            endpoint_default_has_ipv6 INTEGER NOT NULL,
            endpoint_dualstack_hostname TEXT,
            endpoint_dualstack_has_ipv4 INTEGER NOT NULL,
            endpoint_dualstack_has_ipv6 INTEGER NOT NULL,
            PRIMARY KEY (service_name, partition_name, region_name)
        )",
        [],
    )?;
    Ok(())
}

impl Region {
    pub fn upsert(&self, conn: &Connection) -> Result<()> {
        conn.execute(
            "INSERT INTO region (region_name, partition_name, description)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (region_name, partition_name)
             DO UPDATE SET description = excluded.description",
            params![self.name, self.partition, self.description],
        )?;
        Ok(())
    }
}

impl EndpointRecord {
    pub fn upsert(&self, conn: &Connection) -> Result<()> {
        conn.execute(
            "INSERT INTO endpoint (
                service_name,
                partition_name,
                region_name,
                endpoint_default_hostname,
                endpoint_default_has_ipv4,
                endpoint_default_has_ipv6,
                endpoint_dualstack_hostname,
                endpoint_dualstack_has_ipv4,
                endpoint_dualstack_has_ipv6
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT (service_name, partition_name, region_name)
            DO UPDATE SET
                endpoint_default_hostname = excluded.endpoint_default_hostname,
                endpoint_default_has_ipv4 = excluded.endpoint_default_has_ipv4,
                endpoint_default_has_ipv6 = excluded.endpoint_default_has_ipv6,
                endpoint_dualstack_hostname = excluded.endpoint_dualstack_hostname,
                endpoint_dualstack_has_ipv4 = excluded.endpoint_dualstack_has_ipv4,
                endpoint_dualstack_has_ipv6 = excluded.endpoint_dualstack_has_ipv6",
            params![
                self.service,
                self.partition,
                self.region,
                self.endpoint_default.hostname,
                self.endpoint_default.has_ipv4,
                self.endpoint_default.has_ipv6,
                self.endpoint_dualstack.hostname,
                self.endpoint_dualstack.has_ipv4,
                self.endpoint_dualstack.has_ipv6,
            ],
        )?;
        Ok(())
    }
}

/// Persist a full run. Work is committed one region at a time so every
/// transaction stays a few hundred rows at most.
pub fn persist_run(
    conn: &mut Connection,
    regions: &[Region],
    collection: &EndpointCollection,
) -> Result<()> {
    create_tables_if_not_exists(conn)?;

    for region in regions {
        let tx = conn.transaction()?;
        region.upsert(&tx)?;
        for record in collection
            .records()
            .filter(|record| record.region == region.name && record.partition == region.partition)
        {
            record.upsert(&tx)?;
        }
        tx.commit()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::new_test_connection;
    use crate::endpoint::EndpointInfo;

    fn sample_region() -> Region {
        Region {
            name: "us-east-2".to_string(),
            partition: "aws".to_string(),
            description: "use2".to_string(),
        }
    }

    fn sample_record() -> EndpointRecord {
        EndpointRecord {
            service: "ec2".to_string(),
            partition: "aws".to_string(),
            region: "us-east-2".to_string(),
            endpoint_default: EndpointInfo {
                hostname: Some("ec2.us-east-2.amazonaws.com".to_string()),
                has_ipv4: true,
                has_ipv6: false,
            },
            endpoint_dualstack: EndpointInfo {
                hostname: Some("ec2.us-east-2.api.aws".to_string()),
                has_ipv4: true,
                has_ipv6: true,
            },
            deprecated: false,
        }
    }

    #[test]
    fn test_region_upsert_updates_description() {
        let conn = new_test_connection();

        let mut region = sample_region();
        region.upsert(&conn).unwrap();
        region.description = "US East (Ohio)".to_string();
        region.upsert(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM region", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);

        let description: String = conn
            .query_row(
                "SELECT description FROM region WHERE region_name = 'us-east-2'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(description, "US East (Ohio)");
    }

    #[test]
    fn test_endpoint_upsert_replaces_on_conflict() {
        let conn = new_test_connection();

        let mut record = sample_record();
        record.upsert(&conn).unwrap();

        record.endpoint_default.has_ipv6 = true;
        record.upsert(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM endpoint", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);

        let has_ipv6: bool = conn
            .query_row(
                "SELECT endpoint_default_has_ipv6 FROM endpoint WHERE service_name = 'ec2'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(has_ipv6);
    }

    #[test]
    fn test_endpoint_absent_variant_stores_nulls() {
        let conn = new_test_connection();

        let record = EndpointRecord::absent("health", "aws-cn", "cn-north-1");
        record.upsert(&conn).unwrap();

        let (hostname, has_ipv4): (Option<String>, bool) = conn
            .query_row(
                "SELECT endpoint_default_hostname, endpoint_default_has_ipv4
                 FROM endpoint WHERE service_name = 'health'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert!(hostname.is_none());
        assert!(!has_ipv4);
    }

    #[test]
    fn test_persist_run_commits_per_region() {
        let mut conn = rusqlite::Connection::open_in_memory().unwrap();

        let regions = vec![
            sample_region(),
            Region {
                name: "cn-north-1".to_string(),
                partition: "aws-cn".to_string(),
                description: "cnn1".to_string(),
            },
        ];

        let mut collection = EndpointCollection::new();
        collection.insert(sample_record());
        collection.insert(EndpointRecord::absent("ec2", "aws-cn", "cn-north-1"));

        persist_run(&mut conn, &regions, &collection).unwrap();

        let regions_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM region", [], |row| row.get(0))
            .unwrap();
        let endpoints_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM endpoint", [], |row| row.get(0))
            .unwrap();
        assert_eq!(regions_count, 2);
        assert_eq!(endpoints_count, 2);

        // a second run upserts rather than duplicating
        persist_run(&mut conn, &regions, &collection).unwrap();
        let endpoints_again: i64 = conn
            .query_row("SELECT COUNT(*) FROM endpoint", [], |row| row.get(0))
            .unwrap();
        assert_eq!(endpoints_again, 2);
    }
}
